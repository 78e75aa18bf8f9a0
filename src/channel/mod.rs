//! Channel model abstraction.
//!
//! The polymorphic contract every channel strategy satisfies, plus the
//! helpers shared between variants. Three strategies exist:
//!
//! - `simple`: no propagation modeling, every send succeeds
//! - `direct`: short-range V2V over a single fixed channel
//! - `cellular`: V2I with base-station handover, wired backhaul, and HARQ
//!   retransmission delays
//!
//! The active variant is fixed for a simulation run; the physical layer
//! drives it through a `Box<dyn ChannelModel>`.

use crate::scheduler::{EventSink, NetworkEventKind};
use crate::settings::ModulationEntry;
use crate::types::{ChannelId, NetworkMessage, NetworkNode, ObjectRegistry, SimNanos};

pub mod cellular;
pub mod direct;
pub mod simple;

pub use cellular::ChannelModelCellular;
pub use direct::ChannelModelDirect;
pub use simple::ChannelModelSimple;

/// Maximum interference range as a multiple of the clear-reception range.
/// Between the two, a transmission is too weak to decode but still strong
/// enough to disturb the receiver.
pub const INTERFERENCE_RANGE_FACTOR: f64 = 1.3;

/// Whether channel ids are being computed for the sending or the receiving
/// side of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    Sending,
    Receiving,
}

/// Per-call collaborators handed to a channel model: the current simulated
/// time, the physical object registry for the multipath scan, and the sink
/// receiving scheduled events.
pub struct TransmissionContext<'a> {
    pub now: SimNanos,
    pub registry: &'a ObjectRegistry,
    pub events: &'a mut dyn EventSink,
}

/// The contract every channel strategy implements.
///
/// All methods take `&mut self`: exclusive access is the concurrency
/// discipline. Hosts fanning one broadcast out to many candidate receivers
/// within a timestep do so sequentially through the same mutable handle, so
/// the handover and registry maps never see torn reads or lost updates.
/// `simulation_start` must complete before any other call of the run.
pub trait ChannelModel {
    /// One-time hook invoked before any events are scheduled. Populates
    /// static registries (the cellular base-station directory).
    fn simulation_start(&mut self, registry: &ObjectRegistry);

    /// The set of channel ids the node may use for the given direction.
    /// Pure given unchanged handover state.
    fn compute_channel_ids(&mut self, node: &NetworkNode, direction: LinkDirection) -> Vec<ChannelId>;

    /// Row index into the variant's modulation/data-rate table for this
    /// node's transmissions.
    fn modulation_index(&self, node: &NetworkNode) -> usize;

    /// Decide the outcome of one sender→receiver transmission attempt and
    /// schedule zero, one, or two paired events. Failure is expressed by
    /// scheduling nothing; no error ever propagates out of this call.
    fn compute_transmission(
        &mut self,
        sender: &NetworkNode,
        receiver: &NetworkNode,
        message: &mut NetworkMessage,
        ctx: &mut TransmissionContext<'_>,
    );

    /// Extra delay to apply to the sender's transmission-end notification,
    /// consumed (and reset) once per send. The cellular variant reports the
    /// largest pending HARQ delay of the receiver batch here; everything
    /// else keeps the default of zero.
    fn transmission_end_delay(&mut self) -> SimNanos {
        0
    }
}

/// Schedule the receive-start/receive-end pair for a successful delivery.
/// The event copies carry the receive timestamp.
pub(crate) fn schedule_receive_pair(
    events: &mut dyn EventSink,
    target: &NetworkNode,
    message: &NetworkMessage,
    start: SimNanos,
    end: SimNanos,
) {
    let mut delivered = message.clone();
    delivered.receive_time = Some(end);
    events.schedule(start, NetworkEventKind::ReceiveStart, target.id, delivered.clone());
    events.schedule(end, NetworkEventKind::ReceiveEnd, target.id, delivered);
}

/// Schedule the interference-start/interference-end pair for a transmission
/// that reaches the receiver only as noise.
pub(crate) fn schedule_interference_pair(
    events: &mut dyn EventSink,
    target: &NetworkNode,
    message: &NetworkMessage,
    start: SimNanos,
    end: SimNanos,
) {
    events.schedule(start, NetworkEventKind::InterferenceStart, target.id, message.clone());
    events.schedule(end, NetworkEventKind::InterferenceEnd, target.id, message.clone());
}

/// First channel id present in both sets, if any. The sender's sending set
/// is matched against the receiver's receiving set; the match is what gets
/// assigned to the message.
pub(crate) fn first_common_channel(sending: &[ChannelId], receiving: &[ChannelId]) -> Option<ChannelId> {
    sending.iter().copied().find(|id| receiving.contains(id))
}

/// Modulation row lookup with graceful degradation: an out-of-range index
/// is a configuration inconsistency, logged and clamped to the nearest
/// valid row instead of aborting the transmission.
pub(crate) fn modulation_row(table: &[ModulationEntry], index: usize) -> ModulationEntry {
    if let Some(row) = table.get(index) {
        return *row;
    }
    match table.last() {
        Some(row) => {
            log::warn!("modulation index {} out of range for a {}-row table", index, table.len());
            *row
        }
        None => {
            log::warn!("empty modulation table; using nominal QPSK 1/2 row");
            ModulationEntry {
                data_rate: 6_000_000.0,
                bits_per_signal: 2,
                code_rate_numerator: 1,
                code_rate_denominator: 2,
                normalization: 1.0,
            }
        }
    }
}
