//! Short-range V2V channel model.
//!
//! Single fixed channel, vehicles only. Each transmission attempt runs the
//! full impairment model (noise floor, path loss, multipath scan, Doppler,
//! modulation scaling) and draws once against the resulting success
//! probability. Within clear range a winning draw delivers; losing draws
//! inside the interference range still disturb the receiver; anything
//! farther is silence.

use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error_model::{success_probability, total_bit_error_rate};
use crate::geometry::distance;
use crate::settings::DirectSettings;
use crate::timing::{propagation_delay, schedule_at, transmission_time};
use crate::types::{ChannelId, NetworkMessage, NetworkNode, ObjectRegistry};

use super::{
    ChannelModel, INTERFERENCE_RANGE_FACTOR, LinkDirection, TransmissionContext, first_common_channel,
    modulation_row, schedule_interference_pair, schedule_receive_pair,
};

pub struct ChannelModelDirect<R: Rng = StdRng> {
    settings: DirectSettings,
    rng: R,
}

impl ChannelModelDirect<StdRng> {
    /// Model with a seeded generator; the same seed reproduces the same
    /// sequence of draw outcomes.
    pub fn seeded(settings: DirectSettings, seed: u64) -> Self {
        ChannelModelDirect {
            settings,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> ChannelModelDirect<R> {
    pub fn new(settings: DirectSettings, rng: R) -> Self {
        ChannelModelDirect { settings, rng }
    }
}

impl<R: Rng> ChannelModel for ChannelModelDirect<R> {
    fn simulation_start(&mut self, _registry: &ObjectRegistry) {}

    fn compute_channel_ids(&mut self, _node: &NetworkNode, _direction: LinkDirection) -> Vec<ChannelId> {
        vec![0]
    }

    fn modulation_index(&self, _node: &NetworkNode) -> usize {
        self.settings.default_modulation_index
    }

    fn compute_transmission(
        &mut self,
        sender: &NetworkNode,
        receiver: &NetworkNode,
        message: &mut NetworkMessage,
        ctx: &mut TransmissionContext<'_>,
    ) {
        // Base stations never take part in direct V2V.
        if !receiver.is_vehicle() {
            return;
        }

        let sending = self.compute_channel_ids(sender, LinkDirection::Sending);
        let receiving = self.compute_channel_ids(receiver, LinkDirection::Receiving);
        let Some(matched) = first_common_channel(&sending, &receiving) else {
            return;
        };
        message.assign_channel(matched);

        let Some(channel) = self.settings.channels.get(matched).copied() else {
            log::warn!("direct channel table has no entry for channel {matched}, dropping transmission");
            return;
        };

        let clear_range = self.settings.clear_range;
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

        let start = schedule_at(ctx.now, propagation_delay(sender, receiver, &self.settings.timing));
        let end = schedule_at(start, transmission_time(message.length_bits, row.data_rate));

        if success >= draw && d <= clear_range {
            schedule_receive_pair(ctx.events, receiver, message, start, end);
        } else if d <= interference_range {
            schedule_interference_pair(ctx.events, receiver, message, start, end);
        }
        // Beyond the interference range the signal is too weak to matter.
    }
}
