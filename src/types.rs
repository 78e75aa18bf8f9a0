//! Type definitions for the channel simulation.
//!
//! Contains the data structures shared by every channel model:
//! - Message and node value types
//! - Object kinds and identity aliases
//! - The physical object registry used for multipath scans and
//!   base-station discovery

use serde::Deserialize;

/// Stable numeric identity of a network node. Used as the key for
/// channel-selection hashing and for the cellular handover maps.
pub type NodeId = u32;

/// Index into a variant's channel table.
pub type ChannelId = usize;

/// Simulated time in nanoseconds, monotonic from simulation start.
pub type SimNanos = u64;

/// Simple 2D vector in world coordinates (meters for positions,
/// meters per second for velocities).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    pub fn dot(&self, other: &Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Default for Vec2 {
    fn default() -> Self {
        Vec2::ZERO
    }
}

/// Kind of physical object a node wraps. Determines which channel models
/// will consider it as a receiver and which modulation table half it uses.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    Vehicle,
    BaseStation,
}

/// A network-capable simulation object as seen by the channel layer.
///
/// Wraps exactly one physical object for its entire lifetime and exposes
/// the position, velocity, identity, and kind the propagation model needs.
/// Nodes are plain values; channel models never own them, they only keep
/// transient lookup maps keyed by [`NodeId`].
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkNode {
    pub id: NodeId,
    pub kind: ObjectKind,
    /// Position in meters, world coordinates.
    pub position: Vec2,
    /// Velocity in meters per second.
    #[serde(default)]
    pub velocity: Vec2,
}

impl NetworkNode {
    pub fn is_vehicle(&self) -> bool {
        self.kind == ObjectKind::Vehicle
    }

    pub fn is_base_station(&self) -> bool {
        self.kind == ObjectKind::BaseStation
    }
}

/// Enumerable collection of all physical objects currently in the
/// simulation. Consumed by the multipath scan (every object near the
/// direct path degrades the signal) and by the cellular model to discover
/// base stations at simulation start.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    objects: Vec<NetworkNode>,
}

impl ObjectRegistry {
    pub fn new(objects: Vec<NetworkNode>) -> Self {
        ObjectRegistry { objects }
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkNode> {
        self.objects.iter()
    }

    pub fn get(&self, id: NodeId) -> Option<&NetworkNode> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All registered base stations.
    pub fn base_stations(&self) -> impl Iterator<Item = &NetworkNode> {
        self.objects.iter().filter(|o| o.is_base_station())
    }
}

/// A single transmission attempt as it travels through the channel layer.
///
/// Created by the sending layer, mutated exactly once by the channel model
/// (channel id assignment on the first sender/receiver channel match) and
/// read-only for receivers afterwards. The copies scheduled into receive
/// events carry the filled-in receive timestamp.
#[derive(Debug, Clone)]
pub struct NetworkMessage {
    /// Sender node identity, carried for logging and statistics.
    pub sender: NodeId,
    /// Payload length in bits.
    pub length_bits: u32,
    /// Bits encoded per signal: 1/2/4/6 for BPSK/QPSK/16-QAM/64-QAM.
    pub bits_per_signal: u8,
    /// Code rate, expected in (0, 1]. Malformed values degrade gracefully
    /// in the error model instead of failing the transmission.
    pub code_rate: f64,
    /// Channel id assigned by whichever channel model first matched the
    /// sender and receiver channel sets. Set exactly once.
    pub channel_id: Option<ChannelId>,
    /// Marks a base-station backhaul transmission that bypasses the radio
    /// error model entirely.
    pub wired: bool,
    /// Simulated time at which the message was fully received. Filled in
    /// on the event copies scheduled for successful deliveries.
    pub receive_time: Option<SimNanos>,
}

impl NetworkMessage {
    pub fn new(sender: NodeId, length_bits: u32, bits_per_signal: u8, code_rate: f64) -> Self {
        NetworkMessage {
            sender,
            length_bits,
            bits_per_signal,
            code_rate,
            channel_id: None,
            wired: false,
            receive_time: None,
        }
    }

    pub fn wired(mut self) -> Self {
        self.wired = true;
        self
    }

    /// Assign the channel id unless a previous model call already did.
    pub fn assign_channel(&mut self, channel: ChannelId) {
        if self.channel_id.is_none() {
            self.channel_id = Some(channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_is_assigned_exactly_once() {
        let mut msg = NetworkMessage::new(1, 800, 2, 0.5);
        msg.assign_channel(3);
        msg.assign_channel(7);
        assert_eq!(msg.channel_id, Some(3));
    }

    #[test]
    fn registry_filters_base_stations() {
        let registry = ObjectRegistry::new(vec![
            NetworkNode {
                id: 1,
                kind: ObjectKind::Vehicle,
                position: Vec2::new(0.0, 0.0),
                velocity: Vec2::ZERO,
            },
            NetworkNode {
                id: 2,
                kind: ObjectKind::BaseStation,
                position: Vec2::new(100.0, 0.0),
                velocity: Vec2::ZERO,
            },
        ]);
        let stations: Vec<_> = registry.base_stations().collect();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id, 2);
    }
}
