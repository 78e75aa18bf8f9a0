//! Static per-variant configuration consumed by the channel models.
//!
//! Contains the channel tables (carrier frequency and bandwidth per channel
//! id), the modulation/data-rate tables, and the timing bounds. All structs
//! deserialize from the scene file; the `Default` impls carry the fixed
//! tables the models were calibrated against, so a scene only overrides
//! what it needs.

use serde::Deserialize;

use crate::types::{ChannelId, NodeId, SimNanos};

/// One row of a channel table: a carrier frequency and its bandwidth.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ChannelEntry {
    /// Carrier center frequency in Hz.
    pub carrier_frequency: f64,
    /// Channel bandwidth in Hz.
    pub bandwidth: f64,
}

/// One row of a modulation/data-rate table.
///
/// The code rate is stored as a fraction so the table stays exact in the
/// scene file; `code_rate()` guards the division.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ModulationEntry {
    /// Net data rate in bits per second.
    pub data_rate: f64,
    /// Bits encoded per signal: 1/2/4/6 for BPSK/QPSK/16-QAM/64-QAM.
    pub bits_per_signal: u8,
    pub code_rate_numerator: u32,
    pub code_rate_denominator: u32,
    /// Normalization constant dividing the modulation scaling factor in the
    /// error model. 1.0 leaves the empirical formula untouched.
    pub normalization: f64,
}

impl ModulationEntry {
    const fn row(data_rate: f64, bits_per_signal: u8, num: u32, den: u32) -> Self {
        ModulationEntry {
            data_rate,
            bits_per_signal,
            code_rate_numerator: num,
            code_rate_denominator: den,
            normalization: 1.0,
        }
    }

    /// Code rate as a float; a zero denominator degrades to 1.0 rather
    /// than dividing by zero.
    pub fn code_rate(&self) -> f64 {
        if self.code_rate_denominator == 0 {
            return 1.0;
        }
        self.code_rate_numerator as f64 / self.code_rate_denominator as f64
    }
}

/// Timing bounds applied when converting geometry into event times.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TimingBounds {
    /// Minimum propagation delay in nanoseconds. Keeps receive events of
    /// co-located nodes strictly after the send timestamp.
    pub min_propagation_delay_ns: SimNanos,
}

impl Default for TimingBounds {
    fn default() -> Self {
        TimingBounds { min_propagation_delay_ns: 1 }
    }
}

/// Settings for the trivial always-succeeds model.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimpleSettings {
    pub modulation: Vec<ModulationEntry>,
    pub default_modulation_index: usize,
    pub timing: TimingBounds,
}

impl Default for SimpleSettings {
    fn default() -> Self {
        SimpleSettings {
            // A single nominal rate; the simple model never rejects anything,
            // it only needs a data rate for the transmission time.
            modulation: vec![ModulationEntry::row(6_000_000.0, 2, 1, 2)],
            default_modulation_index: 0,
            timing: TimingBounds::default(),
        }
    }
}

/// Settings for the short-range V2V model.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DirectSettings {
    /// Channel table; the direct model only ever uses channel 0.
    pub channels: Vec<ChannelEntry>,
    /// 802.11p-style modulation/data-rate table.
    pub modulation: Vec<ModulationEntry>,
    pub default_modulation_index: usize,
    /// Maximum clear-reception range in meters.
    pub clear_range: f64,
    pub timing: TimingBounds,
}

impl Default for DirectSettings {
    fn default() -> Self {
        DirectSettings {
            channels: vec![ChannelEntry {
                carrier_frequency: 5.9e9,
                bandwidth: 10e6,
            }],
            modulation: vec![
                ModulationEntry::row(3_000_000.0, 1, 1, 2),
                ModulationEntry::row(4_500_000.0, 1, 3, 4),
                ModulationEntry::row(6_000_000.0, 2, 1, 2),
                ModulationEntry::row(9_000_000.0, 2, 3, 4),
                ModulationEntry::row(12_000_000.0, 4, 1, 2),
                ModulationEntry::row(18_000_000.0, 4, 3, 4),
                ModulationEntry::row(24_000_000.0, 6, 2, 3),
                ModulationEntry::row(27_000_000.0, 6, 3, 4),
            ],
            // 6 Mbit/s QPSK 1/2, the usual V2V safety-message rate.
            default_modulation_index: 2,
            clear_range: 1000.0,
            timing: TimingBounds::default(),
        }
    }
}

/// Number of cellular frequency groups. Base stations are spread across the
/// groups by identity; a mobile node inherits the group of its serving
/// station.
pub const FREQUENCY_GROUP_COUNT: usize = 3;

/// Settings for the cellular V2I model.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CellularSettings {
    /// Contiguous channel ids per frequency group and sub-band.
    pub channels_per_group: usize,
    /// First carrier of the uplink sub-band in Hz.
    pub uplink_base_frequency: f64,
    /// First carrier of the downlink sub-band in Hz.
    pub downlink_base_frequency: f64,
    /// Bandwidth of each cellular channel in Hz; carriers are spaced by it.
    pub channel_bandwidth: f64,
    /// Modulation table: lower half uplink rows, upper half downlink rows.
    pub modulation: Vec<ModulationEntry>,
    /// Default (uplink) modulation index for mobile nodes. Base stations
    /// use this shifted into the downlink half of the table.
    pub default_modulation_index: usize,
    /// Handover hysteresis offset in meters. A candidate station has to be
    /// closer than the assigned one by twice this margin to win.
    pub handover_offset: f64,
    /// Fixed delay for wired backhaul deliveries in nanoseconds.
    pub backhaul_delay_ns: SimNanos,
    /// Explicit backhaul topology as station-id pairs (directed). An empty
    /// list connects every registered station to every other.
    pub backhaul_links: Vec<(NodeId, NodeId)>,
    pub timing: TimingBounds,
}

impl Default for CellularSettings {
    fn default() -> Self {
        CellularSettings {
            channels_per_group: 20,
            // LTE band 1 style split: uplink around 1.92 GHz, downlink
            // around 2.11 GHz.
            uplink_base_frequency: 1.92e9,
            downlink_base_frequency: 2.11e9,
            channel_bandwidth: 180e3,
            modulation: vec![
                // Uplink half
                ModulationEntry::row(12_000_000.0, 2, 1, 2),
                ModulationEntry::row(24_000_000.0, 4, 1, 2),
                ModulationEntry::row(36_000_000.0, 6, 3, 4),
                // Downlink half
                ModulationEntry::row(18_000_000.0, 2, 3, 4),
                ModulationEntry::row(36_000_000.0, 4, 3, 4),
                ModulationEntry::row(54_000_000.0, 6, 5, 6),
            ],
            default_modulation_index: 0,
            handover_offset: 30.0,
            backhaul_delay_ns: 1_000_000,
            backhaul_links: Vec::new(),
            timing: TimingBounds::default(),
        }
    }
}

impl CellularSettings {
    /// Total number of channel ids across both sub-bands.
    pub fn channel_count(&self) -> usize {
        2 * FREQUENCY_GROUP_COUNT * self.channels_per_group
    }

    /// First channel id of a group's uplink block.
    pub fn uplink_base(&self, group: usize) -> ChannelId {
        group * self.channels_per_group
    }

    /// First channel id of a group's downlink block.
    pub fn downlink_base(&self, group: usize) -> ChannelId {
        (FREQUENCY_GROUP_COUNT + group) * self.channels_per_group
    }

    /// All channel ids of a group's uplink block.
    pub fn uplink_channels(&self, group: usize) -> Vec<ChannelId> {
        let base = self.uplink_base(group);
        (base..base + self.channels_per_group).collect()
    }

    /// All channel ids of a group's downlink block.
    pub fn downlink_channels(&self, group: usize) -> Vec<ChannelId> {
        let base = self.downlink_base(group);
        (base..base + self.channels_per_group).collect()
    }

    /// Carrier frequency and bandwidth for a channel id. Ids below the
    /// downlink offset are uplink channels.
    pub fn channel(&self, id: ChannelId) -> ChannelEntry {
        let downlink_offset = FREQUENCY_GROUP_COUNT * self.channels_per_group;
        let (base, slot) = if id < downlink_offset {
            (self.uplink_base_frequency, id)
        } else {
            (self.downlink_base_frequency, id - downlink_offset)
        };
        ChannelEntry {
            carrier_frequency: base + slot as f64 * self.channel_bandwidth,
            bandwidth: self.channel_bandwidth,
        }
    }

    /// Maximum clear-reception range in meters for a modulation order.
    /// Denser constellations decode over shorter distances.
    pub fn clear_range(&self, bits_per_signal: u8) -> f64 {
        match bits_per_signal {
            6 => 1000.0,
            4 => 3000.0,
            _ => 5000.0,
        }
    }
}
