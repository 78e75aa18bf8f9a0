//! Cellular V2I channel model with handover and HARQ retransmission.
//!
//! Differences from the direct model:
//! - Uplink/downlink sub-bands across three frequency groups; base stations
//!   use every channel of their group's block, mobile nodes exactly one,
//!   picked by identity.
//! - A handover map tracks each mobile node's serving station, with a
//!   hysteresis margin so assignments don't flap between two stations at
//!   similar distance.
//! - Wired backhaul between connected base stations bypasses the radio
//!   error model and delivers after a fixed delay.
//! - A failed draw whose success probability is still above the HARQ floor
//!   becomes a delayed delivery; the largest delay of a receiver batch
//!   extends the sender's busy time through `transmission_end_delay`.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error_model::{success_probability, total_bit_error_rate};
use crate::geometry::distance;
use crate::settings::{CellularSettings, FREQUENCY_GROUP_COUNT};
use crate::timing::{propagation_delay, schedule_at, transmission_time};
use crate::types::{ChannelId, NetworkMessage, NetworkNode, NodeId, ObjectRegistry, SimNanos};

use super::{
    ChannelModel, INTERFERENCE_RANGE_FACTOR, LinkDirection, TransmissionContext, first_common_channel,
    modulation_row, schedule_interference_pair, schedule_receive_pair,
};

/// Minimum success probability at which a failed draw is still recovered by
/// retransmission instead of degrading to interference. The floor itself
/// does not qualify.
pub const HARQ_FLOOR: f64 = 0.3;

/// Whether a failed draw with this success probability is recovered by
/// retransmission. Strictly above the floor; the floor itself degrades to
/// the interference-or-silence outcome.
pub fn harq_recoverable(success: f64) -> bool {
    success > HARQ_FLOOR
}

/// A registered base station: its snapshot from simulation start, its
/// frequency group, and the stations its backhaul reaches.
struct StationInfo {
    node: NetworkNode,
    group: usize,
    connected: HashSet<NodeId>,
}

pub struct ChannelModelCellular<R: Rng = StdRng> {
    settings: CellularSettings,
    rng: R,
    /// Base-station directory, populated once at simulation start.
    stations: HashMap<NodeId, StationInfo>,
    /// Handover memory: mobile node → currently serving station.
    assignments: HashMap<NodeId, NodeId>,
    /// Largest HARQ delay of the receiver batch currently being processed.
    pending_harq_delay: SimNanos,
    missing_station_warned: bool,
}

impl ChannelModelCellular<StdRng> {
    /// Model with a seeded generator; the same seed reproduces the same
    /// sequence of draw outcomes.
    pub fn seeded(settings: CellularSettings, seed: u64) -> Self {
        ChannelModelCellular::new(settings, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ChannelModelCellular<R> {
    pub fn new(settings: CellularSettings, rng: R) -> Self {
        ChannelModelCellular {
            settings,
            rng,
            stations: HashMap::new(),
            assignments: HashMap::new(),
            pending_harq_delay: 0,
            missing_station_warned: false,
        }
    }

    /// Frequency group of a base station. Registered stations carry their
    /// group in the directory; the identity hash keeps unknown stations on
    /// the same formula.
    fn station_group(&self, id: NodeId) -> usize {
        self.stations
            .get(&id)
            .map(|info| info.group)
            .unwrap_or(id as usize % FREQUENCY_GROUP_COUNT)
    }

    /// Serving station for a mobile node, updating the handover map.
    ///
    /// The nearest registered station wins over the current assignment only
    /// when it is closer by more than twice the hysteresis offset; anything
    /// inside that margin keeps the existing assignment stable. Unassigned
    /// nodes simply take the nearest station.
    fn serving_station(&mut self, node: &NetworkNode) -> Option<NodeId> {
        let nearest = self
            .stations
            .values()
            .map(|info| (info.node.id, distance(&node.position, &info.node.position)))
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let margin = 2.0 * self.settings.handover_offset;
        let assigned = match self.assignments.get(&node.id) {
            Some(&current) => {
                let current_distance = self
                    .stations
                    .get(&current)
                    .map(|info| distance(&node.position, &info.node.position));
                match current_distance {
                    Some(d) if nearest.1 + margin >= d => current,
                    _ => nearest.0,
                }
            }
            None => nearest.0,
        };

        self.assignments.insert(node.id, assigned);
        Some(assigned)
    }

    /// Frequency group a mobile node operates in: the group of its serving
    /// station, or group 0 when no station is registered (configuration
    /// inconsistency, logged once, never fatal).
    fn mobile_group(&mut self, node: &NetworkNode) -> usize {
        match self.serving_station(node) {
            Some(station) => self.station_group(station),
            None => {
                if !self.missing_station_warned {
                    log::warn!(
                        "no base station registered for handover of node {}; falling back to frequency group 0",
                        node.id
                    );
                    self.missing_station_warned = true;
                }
                0
            }
        }
    }

    /// The single channel slot a mobile node occupies inside a group block.
    fn mobile_slot(&self, node: &NetworkNode) -> usize {
        node.id as usize % self.settings.channels_per_group
    }

    fn wired_transmission(
        &mut self,
        sender: &NetworkNode,
        receiver: &NetworkNode,
        message: &NetworkMessage,
        ctx: &mut TransmissionContext<'_>,
    ) {
        if !sender.is_base_station() || !receiver.is_base_station() {
            log::debug!(
                "wired message from {} to {} dropped: both ends must be base stations",
                sender.id,
                receiver.id
            );
            return;
        }
        let connected = self
            .stations
            .get(&sender.id)
            .map(|info| info.connected.contains(&receiver.id))
            .unwrap_or(false);
        if !connected {
            log::debug!("wired message from {} to {} dropped: no backhaul link", sender.id, receiver.id);
            return;
        }

        let row = modulation_row(&self.settings.modulation, self.modulation_index(sender));
        let start = schedule_at(ctx.now, self.settings.backhaul_delay_ns);
        let end = schedule_at(start, transmission_time(message.length_bits, row.data_rate));
        schedule_receive_pair(ctx.events, receiver, message, start, end);
    }
}

impl<R: Rng> ChannelModel for ChannelModelCellular<R> {
    /// Populates the base-station directory. Must run before any other call
    /// of the simulation; the registry is append-only afterwards.
    fn simulation_start(&mut self, registry: &ObjectRegistry) {
        let station_ids: Vec<NodeId> = registry.base_stations().map(|s| s.id).collect();
        for station in registry.base_stations() {
            let connected: HashSet<NodeId> = if self.settings.backhaul_links.is_empty() {
                // No explicit topology: every station reaches every other.
                station_ids.iter().copied().filter(|&id| id != station.id).collect()
            } else {
                self.settings
                    .backhaul_links
                    .iter()
                    .filter(|(from, _)| *from == station.id)
                    .map(|(_, to)| *to)
                    .collect()
            };
            self.stations.insert(
                station.id,
                StationInfo {
                    node: station.clone(),
                    group: station.id as usize % FREQUENCY_GROUP_COUNT,
                    connected,
                },
            );
        }
        log::info!("cellular channel model initialized with {} base stations", self.stations.len());
    }

    fn compute_channel_ids(&mut self, node: &NetworkNode, direction: LinkDirection) -> Vec<ChannelId> {
        if node.is_base_station() {
            let group = self.station_group(node.id);
            // Stations transmit on their whole downlink block and listen on
            // their whole uplink block.
            return match direction {
                LinkDirection::Sending => self.settings.downlink_channels(group),
                LinkDirection::Receiving => self.settings.uplink_channels(group),
            };
        }

        let group = self.mobile_group(node);
        let slot = self.mobile_slot(node);
        match direction {
            LinkDirection::Sending => vec![self.settings.uplink_base(group) + slot],
            LinkDirection::Receiving => vec![self.settings.downlink_base(group) + slot],
        }
    }

    /// Base stations transmit with the downlink half of the modulation
    /// table; mobile nodes stay on the plain uplink default.
    fn modulation_index(&self, node: &NetworkNode) -> usize {
        if node.is_base_station() {
            self.settings.default_modulation_index + self.settings.modulation.len() / 2
        } else {
            self.settings.default_modulation_index
        }
    }

    fn compute_transmission(
        &mut self,
        sender: &NetworkNode,
        receiver: &NetworkNode,
        message: &mut NetworkMessage,
        ctx: &mut TransmissionContext<'_>,
    ) {
        if message.wired {
            self.wired_transmission(sender, receiver, message, ctx);
            return;
        }

        let sending = self.compute_channel_ids(sender, LinkDirection::Sending);
        let receiving = self.compute_channel_ids(receiver, LinkDirection::Receiving);
        let Some(matched) = first_common_channel(&sending, &receiving) else {
            return;
        };
        message.assign_channel(matched);
        let channel = self.settings.channel(matched);

        let clear_range = self.settings.clear_range(message.bits_per_signal);
        let interference_range = clear_range * INTERFERENCE_RANGE_FACTOR;
        let d = distance(&sender.position, &receiver.position);

        let row = modulation_row(&self.settings.modulation, self.modulation_index(sender));
        let ber = total_bit_error_rate(
            sender,
            receiver,
            ctx.registry,
            channel.carrier_frequency,
            message.bits_per_signal,
            message.code_rate,
            row.normalization,
        );
        let success = success_probability(ber, message.length_bits, message.code_rate);
        let draw = self.rng.gen_range(0.0..1.0);

        let prop = propagation_delay(sender, receiver, &self.settings.timing);
        let tx_time = transmission_time(message.length_bits, row.data_rate);
        let start = schedule_at(ctx.now, prop);
        let end = schedule_at(start, tx_time);

        if success >= draw && d <= clear_range {
            schedule_receive_pair(ctx.events, receiver, message, start, end);
        } else if success < draw && harq_recoverable(success) && d <= clear_range {
            // Recoverable failure: the retransmission rounds collapse into
            // one deterministic delay derived from the success probability
            // and the round-trip time.
            let base_rtt = 2 * prop + tx_time;
            let delay = ((1.0 / success - 1.0) * base_rtt as f64) as SimNanos;
            schedule_receive_pair(ctx.events, receiver, message, schedule_at(start, delay), schedule_at(end, delay));
            self.pending_harq_delay = self.pending_harq_delay.max(delay);
        } else if d <= interference_range {
            schedule_interference_pair(ctx.events, receiver, message, start, end);
        }
    }

    /// Largest pending HARQ delay of the batch, consumed exactly once: the
    /// sender's radio stays busy until the slowest recovered receiver would
    /// have its data.
    fn transmission_end_delay(&mut self) -> SimNanos {
        std::mem::take(&mut self.pending_harq_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{NetworkEventKind, ScheduledEvent};
    use crate::types::{ObjectKind, Vec2};
    use rand::rngs::mock::StepRng;

    fn vehicle(id: u32, x: f64) -> NetworkNode {
        NetworkNode {
            id,
            kind: ObjectKind::Vehicle,
            position: Vec2::new(x, 0.0),
            velocity: Vec2::ZERO,
        }
    }

    fn station(id: u32, x: f64) -> NetworkNode {
        NetworkNode {
            id,
            kind: ObjectKind::BaseStation,
            position: Vec2::new(x, 0.0),
            velocity: Vec2::ZERO,
        }
    }

    fn always_win() -> StepRng {
        StepRng::new(0, 0)
    }

    fn always_lose() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn started_model(rng: StepRng, objects: Vec<NetworkNode>) -> (ChannelModelCellular<StepRng>, ObjectRegistry) {
        let mut model = ChannelModelCellular::new(CellularSettings::default(), rng);
        let registry = ObjectRegistry::new(objects);
        model.simulation_start(&registry);
        (model, registry)
    }

    fn transmit(
        model: &mut ChannelModelCellular<StepRng>,
        registry: &ObjectRegistry,
        sender: &NetworkNode,
        receiver: &NetworkNode,
        message: &mut NetworkMessage,
    ) -> Vec<ScheduledEvent> {
        let mut events: Vec<ScheduledEvent> = Vec::new();
        let mut ctx = TransmissionContext {
            now: 0,
            registry,
            events: &mut events,
        };
        model.compute_transmission(sender, receiver, message, &mut ctx);
        events
    }

    #[test]
    fn uplink_delivery_to_serving_station() {
        // Station 12 hashes to frequency group 0.
        let sender = vehicle(7, 500.0);
        let receiver = station(12, 0.0);
        let (mut model, registry) = started_model(always_win(), vec![sender.clone(), receiver.clone()]);

        let mut message = NetworkMessage::new(7, 3200, 2, 0.5);
        let events = transmit(&mut model, &registry, &sender, &receiver, &mut message);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, NetworkEventKind::ReceiveStart);
        assert_eq!(events[1].kind, NetworkEventKind::ReceiveEnd);
        assert!(events[1].time > events[0].time);
        // Matched the vehicle's single uplink slot in group 0.
        let settings = CellularSettings::default();
        assert_eq!(message.channel_id, Some(settings.uplink_base(0) + 7 % settings.channels_per_group));
        // No HARQ delay on a clean success.
        assert_eq!(model.transmission_end_delay(), 0);
    }

    #[test]
    fn vehicles_have_no_common_cellular_channel() {
        let a = vehicle(1, 0.0);
        let b = vehicle(2, 100.0);
        let base = station(12, 50.0);
        let (mut model, registry) = started_model(always_win(), vec![a.clone(), b.clone(), base]);

        let mut message = NetworkMessage::new(1, 3200, 2, 0.5);
        let events = transmit(&mut model, &registry, &a, &b, &mut message);
        // Sender uses an uplink slot, receiver listens on downlink: no overlap.
        assert!(events.is_empty());
        assert_eq!(message.channel_id, None);
    }

    #[test]
    fn beyond_interference_range_is_silence() {
        let sender = vehicle(7, 7000.0);
        let receiver = station(12, 0.0);
        let (mut model, registry) = started_model(always_win(), vec![sender.clone(), receiver.clone()]);

        // QPSK clear range 5000 m × 1.3 = 6500 m.
        let mut message = NetworkMessage::new(7, 3200, 2, 0.5);
        let events = transmit(&mut model, &registry, &sender, &receiver, &mut message);
        assert!(events.is_empty());
    }

    #[test]
    fn clear_range_depends_on_modulation_order() {
        // 2000 m: inside the QPSK range, outside 64-QAM's 1000 m clear and
        // 1300 m interference ranges.
        let sender = vehicle(7, 2000.0);
        let receiver = station(12, 0.0);
        let (mut model, registry) = started_model(always_win(), vec![sender.clone(), receiver.clone()]);

        let mut qpsk = NetworkMessage::new(7, 3200, 2, 0.5);
        assert_eq!(transmit(&mut model, &registry, &sender, &receiver, &mut qpsk).len(), 2);

        let mut qam64 = NetworkMessage::new(7, 3200, 6, 0.75);
        assert!(transmit(&mut model, &registry, &sender, &receiver, &mut qam64).is_empty());
    }

    #[test]
    fn failed_draw_above_floor_is_delayed_not_dropped() {
        let sender = vehicle(7, 2000.0);
        let receiver = station(12, 0.0);
        let (mut model, registry) = started_model(always_lose(), vec![sender.clone(), receiver.clone()]);

        // Six payload bits keep the success probability around 0.5: above
        // the HARQ floor, below the losing draw.
        let mut message = NetworkMessage::new(7, 6, 2, 0.5);
        let events = transmit(&mut model, &registry, &sender, &receiver, &mut message);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, NetworkEventKind::ReceiveStart);
        assert_eq!(events[1].kind, NetworkEventKind::ReceiveEnd);

        let delay = model.transmission_end_delay();
        assert!(delay > 0);
        // Delivery shifted by exactly the recorded delay relative to the
        // undelayed 2000 m receive-start time.
        let settings = CellularSettings::default();
        let prop = propagation_delay(&sender, &receiver, &settings.timing);
        assert_eq!(events[0].time, prop + delay);
        // Consumed: the next send starts with a clean slate.
        assert_eq!(model.transmission_end_delay(), 0);
    }

    #[test]
    fn harq_floor_boundary_is_exclusive() {
        assert!(!harq_recoverable(HARQ_FLOOR));
        assert!(!harq_recoverable(0.299));
        assert!(harq_recoverable(HARQ_FLOOR + 1e-9));
    }

    #[test]
    fn failed_draw_below_floor_degrades_to_interference() {
        let sender = vehicle(7, 2400.0);
        let receiver = station(12, 0.0);
        let (mut model, registry) = started_model(always_lose(), vec![sender.clone(), receiver.clone()]);

        // One payload bit at 2400 m: success probability ≈ 0.18, below the
        // 0.3 floor, so the failed draw is not recovered.
        let mut message = NetworkMessage::new(7, 1, 2, 0.5);
        let events = transmit(&mut model, &registry, &sender, &receiver, &mut message);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, NetworkEventKind::InterferenceStart);
        assert_eq!(events[1].kind, NetworkEventKind::InterferenceEnd);
        assert_eq!(model.transmission_end_delay(), 0);
    }

    #[test]
    fn handover_selects_clearly_nearer_station() {
        // Stations 12 and 15 both hash to group 0.
        let near = station(12, 100.0);
        let far = station(15, 1000.0);
        let node = vehicle(7, 0.0);
        let (mut model, _registry) = started_model(always_win(), vec![node.clone(), near, far]);

        model.compute_channel_ids(&node, LinkDirection::Sending);
        assert_eq!(model.assignments.get(&7), Some(&12));
    }

    #[test]
    fn handover_hysteresis_keeps_current_station() {
        let a = station(12, 100.0);
        let b = station(15, 1000.0);
        let node = vehicle(7, 0.0);
        let (mut model, _registry) = started_model(always_win(), vec![node.clone(), a, b]);

        model.compute_channel_ids(&node, LinkDirection::Sending);
        assert_eq!(model.assignments.get(&7), Some(&12));

        // The vehicle drives towards station 15 until it is 40 m nearer to
        // it; still inside the 2 × 30 m margin, so the assignment holds.
        let moved = vehicle(7, 570.0);
        model.compute_channel_ids(&moved, LinkDirection::Sending);
        assert_eq!(model.assignments.get(&7), Some(&12));

        // 200 m nearer is beyond any hysteresis: handover to station 15.
        let moved = vehicle(7, 650.0);
        model.compute_channel_ids(&moved, LinkDirection::Sending);
        assert_eq!(model.assignments.get(&7), Some(&15));
    }

    #[test]
    fn channel_ids_are_idempotent_between_state_changes() {
        let base = station(12, 100.0);
        let node = vehicle(7, 0.0);
        let (mut model, _registry) = started_model(always_win(), vec![node.clone(), base]);

        let first = model.compute_channel_ids(&node, LinkDirection::Sending);
        let second = model.compute_channel_ids(&node, LinkDirection::Sending);
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn no_registered_station_falls_back_to_group_zero() {
        let node = vehicle(7, 0.0);
        let (mut model, _registry) = started_model(always_win(), vec![node.clone()]);

        let settings = CellularSettings::default();
        let ids = model.compute_channel_ids(&node, LinkDirection::Sending);
        assert_eq!(ids, vec![settings.uplink_base(0) + 7 % settings.channels_per_group]);
    }

    #[test]
    fn station_modulation_index_is_shifted_to_downlink_half() {
        let base = station(12, 0.0);
        let node = vehicle(7, 0.0);
        let (model, _registry) = started_model(always_win(), vec![node.clone(), base.clone()]);

        let settings = CellularSettings::default();
        assert_eq!(model.modulation_index(&node), settings.default_modulation_index);
        assert_eq!(
            model.modulation_index(&base),
            settings.default_modulation_index + settings.modulation.len() / 2
        );
    }

    #[test]
    fn wired_messages_follow_backhaul_links() {
        let a = station(12, 0.0);
        let b = station(15, 5000.0);
        let (mut model, registry) = started_model(always_lose(), vec![a.clone(), b.clone()]);

        // Default topology is a full mesh: delivery after the fixed
        // backhaul delay, untouched by the radio error model or the draw.
        let mut message = NetworkMessage::new(12, 3200, 2, 0.5).wired();
        let events = transmit(&mut model, &registry, &a, &b, &mut message);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, NetworkEventKind::ReceiveStart);
        assert_eq!(events[0].time, CellularSettings::default().backhaul_delay_ns);
    }

    #[test]
    fn wired_misrouting_is_silently_dropped() {
        let a = station(12, 0.0);
        let b = station(15, 5000.0);
        let v = vehicle(7, 100.0);

        // Directed topology: only a → b exists.
        let mut settings = CellularSettings::default();
        settings.backhaul_links = vec![(12, 15)];
        let mut model = ChannelModelCellular::new(settings, always_win());
        let registry = ObjectRegistry::new(vec![a.clone(), b.clone(), v.clone()]);
        model.simulation_start(&registry);

        let mut reverse = NetworkMessage::new(15, 3200, 2, 0.5).wired();
        assert!(transmit(&mut model, &registry, &b, &a, &mut reverse).is_empty());

        let mut to_vehicle = NetworkMessage::new(12, 3200, 2, 0.5).wired();
        assert!(transmit(&mut model, &registry, &a, &v, &mut to_vehicle).is_empty());

        let mut forward = NetworkMessage::new(12, 3200, 2, 0.5).wired();
        assert_eq!(transmit(&mut model, &registry, &a, &b, &mut forward).len(), 2);
    }
}
