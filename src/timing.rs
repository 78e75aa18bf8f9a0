//! Timing utility for the channel layer.
//!
//! Converts geometry and message parameters into simulated-nanosecond
//! delays: propagation delay between two nodes, transmission time of a
//! message at its assigned data rate, and absolute schedule times relative
//! to "now". Every event a channel model produces is stamped through these
//! helpers, which keeps the causality guarantee in one place: an event time
//! is always >= the current time plus the minimum propagation delay.

use crate::settings::TimingBounds;
use crate::types::{NetworkNode, SimNanos};
use crate::geometry::distance;

/// Speed of light in vacuum, meters per second.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

const NANOS_PER_SEC: f64 = 1e9;

/// Propagation delay between two nodes in simulated nanoseconds.
///
/// Straight-line distance over the speed of light, clamped from below by
/// the configured minimum so that co-located nodes still observe causal
/// ordering (receive events never land at the send timestamp itself).
pub fn propagation_delay(sender: &NetworkNode, receiver: &NetworkNode, bounds: &TimingBounds) -> SimNanos {
    let d = distance(&sender.position, &receiver.position);
    let nanos = (d / SPEED_OF_LIGHT * NANOS_PER_SEC) as SimNanos;
    nanos.max(bounds.min_propagation_delay_ns)
}

/// Transmission time of `length_bits` at `data_rate` bits per second,
/// rounded up to whole nanoseconds. A non-positive data rate degrades to
/// the minimum representable duration of one nanosecond instead of
/// dividing by zero.
pub fn transmission_time(length_bits: u32, data_rate: f64) -> SimNanos {
    if data_rate <= 0.0 {
        return 1;
    }
    let nanos = (length_bits as f64 / data_rate * NANOS_PER_SEC).ceil() as SimNanos;
    nanos.max(1)
}

/// Absolute schedule time for a delay relative to `now`.
pub fn schedule_at(now: SimNanos, delay: SimNanos) -> SimNanos {
    now.saturating_add(delay)
}
