//! Trivial channel model: every send to every node succeeds instantly.
//!
//! No propagation modeling, no randomness, a single channel id for both
//! directions. Used as a deterministic baseline and as a test fixture for
//! the layers above the channel.

use crate::settings::SimpleSettings;
use crate::timing::{propagation_delay, schedule_at, transmission_time};
use crate::types::{ChannelId, NetworkMessage, NetworkNode, ObjectRegistry};

use super::{ChannelModel, LinkDirection, TransmissionContext, modulation_row, schedule_receive_pair};

pub struct ChannelModelSimple {
    settings: SimpleSettings,
}

impl ChannelModelSimple {
    pub fn new(settings: SimpleSettings) -> Self {
        ChannelModelSimple { settings }
    }
}

impl ChannelModel for ChannelModelSimple {
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
        message.assign_channel(0);

        let row = modulation_row(&self.settings.modulation, self.modulation_index(sender));
        let start = schedule_at(ctx.now, propagation_delay(sender, receiver, &self.settings.timing));
        let end = schedule_at(start, transmission_time(message.length_bits, row.data_rate));
        schedule_receive_pair(ctx.events, receiver, message, start, end);
    }
}
