//! Bit-error-rate accumulation for the radio channel models.
//!
//! Contains the five additive impairment terms and their combination:
//! - Constant ambient noise floor
//! - Distance-dependent path loss
//! - Multipath degradation from objects near the direct path
//! - Doppler shift from relative motion along the line of sight
//! - Modulation/code-rate scaling of the accumulated rate
//!
//! plus the conversion from bit error rate to packet success probability.
//!
//! The numeric constants here form the external contract of the model:
//! simulations calibrated against them depend on bit-identical results, so
//! they are not scene-configurable.
//!
//! Units:
//! - Distance: meters
//! - Velocity: meters per second
//! - Frequency: Hz
//! - Rates and probabilities: dimensionless, clamped to [0, 1]

use crate::geometry::{distance, nearest_approach_to_sampled_path, velocity_along_line};
use crate::timing::SPEED_OF_LIGHT;
use crate::types::{NetworkNode, ObjectRegistry};

/// Constant ambient noise floor contribution.
pub const NOISE_FLOOR: f64 = 1e-4;

/// Path loss grows with distance^PATH_LOSS_EXPONENT.
pub const PATH_LOSS_EXPONENT: f64 = 3.0;
/// Scale factor applied to the distance power law.
pub const PATH_LOSS_FACTOR: f64 = 7e-12;

/// Base multipath contribution present on every radio link.
pub const MULTIPATH_BASE: f64 = 1e-5;
/// Per-object multipath scale; divided by the object's nearest approach.
pub const MULTIPATH_SCALE: f64 = 1e-3;
/// Objects farther than this from the direct path are ignored.
pub const MULTIPATH_CUTOFF: f64 = 300.0;
/// Number of equally spaced probe points along the sender→receiver line.
pub const MULTIPATH_SAMPLES: usize = 50;
/// Lower clamp on the nearest-approach distance; an object sitting on the
/// path contributes MULTIPATH_SCALE / MULTIPATH_MIN_DISTANCE.
pub const MULTIPATH_MIN_DISTANCE: f64 = 0.5;

/// Doppler shifts below this magnitude (Hz) contribute nothing.
pub const DOPPLER_THRESHOLD: f64 = 1.0;
/// Base factor of the Doppler error term.
pub const DOPPLER_BASE: f64 = 1e-6;
/// Growth per doubling of the shift frequency.
pub const DOPPLER_SCALE: f64 = 1.4;

/// Distance-dependent path loss term: factor × distance^exponent.
pub fn path_loss(distance_m: f64) -> f64 {
    if distance_m <= 0.0 {
        return 0.0;
    }
    PATH_LOSS_FACTOR * distance_m.powf(PATH_LOSS_EXPONENT)
}

/// Multipath term: base constant plus one contribution per other physical
/// object close to the direct sender→receiver path.
///
/// The path is probed at `MULTIPATH_SAMPLES` equally spaced points; each
/// object's nearest approach to any probe decides whether (and how much) it
/// degrades the link. Objects closer to the path contribute proportionally
/// more error. Sender and receiver themselves are excluded.
pub fn multipath(sender: &NetworkNode, receiver: &NetworkNode, registry: &ObjectRegistry) -> f64 {
    let mut rate = MULTIPATH_BASE;
    for object in registry.iter() {
        if object.id == sender.id || object.id == receiver.id {
            continue;
        }
        let approach =
            nearest_approach_to_sampled_path(&object.position, &sender.position, &receiver.position, MULTIPATH_SAMPLES);
        if approach < MULTIPATH_CUTOFF {
            rate += MULTIPATH_SCALE / approach.max(MULTIPATH_MIN_DISTANCE);
        }
    }
    rate
}

/// Doppler term for the given carrier frequency.
///
/// Each endpoint's velocity component along the line of sight is summed into
/// a relative closing/opening velocity, the relativistic Doppler formula is
/// applied against the carrier, and shifts above the threshold contribute
/// `DOPPLER_BASE × DOPPLER_SCALE^log2(shift)`. Degenerate geometry (zero
/// line-of-sight vector) and near-light velocities contribute zero.
pub fn doppler(sender: &NetworkNode, receiver: &NetworkNode, carrier_frequency: f64) -> f64 {
    // Positive closing velocity: the endpoints approach each other.
    let sender_component = velocity_along_line(&sender.velocity, &sender.position, &receiver.position);
    let receiver_component = velocity_along_line(&receiver.velocity, &receiver.position, &sender.position);
    let closing = sender_component + receiver_component;

    let beta = closing / SPEED_OF_LIGHT;
    if beta.abs() >= 1.0 {
        return 0.0;
    }
    let observed = carrier_frequency * ((1.0 + beta) / (1.0 - beta)).sqrt();
    let shift = (observed - carrier_frequency).abs();
    if shift <= DOPPLER_THRESHOLD {
        return 0.0;
    }
    DOPPLER_BASE * DOPPLER_SCALE.powf(shift.log2())
}

/// Modulation/code-rate scaling factor: `2^(bits_per_signal / 2) × code_rate
/// / normalization`. Denser constellations and weaker coding scale the
/// accumulated error rate up.
///
/// A code rate outside (0, 1] or a non-positive normalization is malformed
/// input; the factor degrades to 1.0 (no scaling) instead of failing the
/// transmission.
pub fn modulation_scale(bits_per_signal: u8, code_rate: f64, normalization: f64) -> f64 {
    if !(code_rate > 0.0 && code_rate <= 1.0) || normalization <= 0.0 {
        return 1.0;
    }
    (2.0f64).powf(bits_per_signal as f64 / 2.0) * code_rate / normalization
}

/// Total bit error rate for one sender/receiver pair on one carrier.
///
/// Accumulates noise floor, path loss, multipath, and Doppler additively,
/// scales the sum by the modulation factor, and clamps to [0, 1].
pub fn total_bit_error_rate(
    sender: &NetworkNode,
    receiver: &NetworkNode,
    registry: &ObjectRegistry,
    carrier_frequency: f64,
    bits_per_signal: u8,
    code_rate: f64,
    normalization: f64,
) -> f64 {
    let d = distance(&sender.position, &receiver.position);
    let rate = NOISE_FLOOR + path_loss(d) + multipath(sender, receiver, registry) + doppler(sender, receiver, carrier_frequency);
    let scaled = rate * modulation_scale(bits_per_signal, code_rate, normalization);
    scaled.clamp(0.0, 1.0)
}

/// Packet success probability from the accumulated bit error rate:
/// `1 − (1 − ber)^(length_bits / code_rate)`.
///
/// A malformed code rate degrades the exponent to the plain bit length.
/// The result is clamped to [0, 1].
pub fn success_probability(ber: f64, length_bits: u32, code_rate: f64) -> f64 {
    let ber = ber.clamp(0.0, 1.0);
    let exponent = if code_rate > 0.0 && code_rate <= 1.0 {
        length_bits as f64 / code_rate
    } else {
        length_bits as f64
    };
    (1.0 - (1.0 - ber).powf(exponent)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObjectKind, Vec2};

    fn vehicle(id: u32, x: f64, y: f64) -> NetworkNode {
        NetworkNode {
            id,
            kind: ObjectKind::Vehicle,
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
        }
    }

    fn moving_vehicle(id: u32, x: f64, vx: f64) -> NetworkNode {
        NetworkNode {
            id,
            kind: ObjectKind::Vehicle,
            position: Vec2::new(x, 0.0),
            velocity: Vec2::new(vx, 0.0),
        }
    }

    #[test]
    fn path_loss_matches_power_law() {
        assert_eq!(path_loss(0.0), 0.0);
        assert!((path_loss(500.0) - 7e-12 * 500.0f64.powi(3)).abs() < 1e-18);
        assert!(path_loss(1000.0) > path_loss(500.0));
    }

    #[test]
    fn multipath_counts_only_objects_near_the_path() {
        let sender = vehicle(1, 0.0, 0.0);
        let receiver = vehicle(2, 1000.0, 0.0);

        // Nothing but the endpoints: base term only.
        let registry = ObjectRegistry::new(vec![sender.clone(), receiver.clone()]);
        assert_eq!(multipath(&sender, &receiver, &registry), MULTIPATH_BASE);

        // One object 10 m off the middle of the path.
        let registry = ObjectRegistry::new(vec![sender.clone(), receiver.clone(), vehicle(3, 500.0, 10.0)]);
        let expected = MULTIPATH_BASE + MULTIPATH_SCALE / 10.0;
        assert!((multipath(&sender, &receiver, &registry) - expected).abs() < 1e-12);

        // One object far beyond the cutoff contributes nothing.
        let registry = ObjectRegistry::new(vec![sender.clone(), receiver.clone(), vehicle(3, 500.0, 500.0)]);
        assert_eq!(multipath(&sender, &receiver, &registry), MULTIPATH_BASE);
    }

    #[test]
    fn multipath_clamps_on_path_objects() {
        let sender = vehicle(1, 0.0, 0.0);
        let receiver = vehicle(2, 1000.0, 0.0);
        // Object exactly on a probe point: distance 0, clamped to 0.5 m.
        let registry = ObjectRegistry::new(vec![sender.clone(), receiver.clone(), vehicle(3, 500.0, 0.0)]);
        let expected = MULTIPATH_BASE + MULTIPATH_SCALE / MULTIPATH_MIN_DISTANCE;
        assert!((multipath(&sender, &receiver, &registry) - expected).abs() < 1e-12);
    }

    #[test]
    fn doppler_is_zero_for_stationary_nodes() {
        let sender = vehicle(1, 0.0, 0.0);
        let receiver = vehicle(2, 500.0, 0.0);
        assert_eq!(doppler(&sender, &receiver, 5.9e9), 0.0);
    }

    #[test]
    fn doppler_grows_with_closing_speed() {
        // 30 m/s closing at 5.9 GHz shifts by ~590 Hz, well over threshold.
        let sender = moving_vehicle(1, 0.0, 30.0);
        let receiver = moving_vehicle(2, 500.0, 0.0);
        let slow = doppler(&sender, &receiver, 5.9e9);
        assert!(slow > 0.0);

        let faster = moving_vehicle(1, 0.0, 60.0);
        assert!(doppler(&faster, &receiver, 5.9e9) > slow);
    }

    #[test]
    fn doppler_handles_colocated_nodes() {
        let a = moving_vehicle(1, 0.0, 50.0);
        let b = moving_vehicle(2, 0.0, -50.0);
        // Zero-length line of sight: the term degrades to zero.
        assert_eq!(doppler(&a, &b, 5.9e9), 0.0);
    }

    #[test]
    fn modulation_scale_orders_constellations() {
        let bpsk = modulation_scale(1, 0.5, 1.0);
        let qpsk = modulation_scale(2, 0.5, 1.0);
        let qam64 = modulation_scale(6, 0.5, 1.0);
        assert!(bpsk < qpsk && qpsk < qam64);
        assert!((qpsk - 1.0).abs() < 1e-12);
    }

    #[test]
    fn modulation_scale_degrades_on_malformed_input() {
        assert_eq!(modulation_scale(2, 0.0, 1.0), 1.0);
        assert_eq!(modulation_scale(2, 1.5, 1.0), 1.0);
        assert_eq!(modulation_scale(2, -0.5, 1.0), 1.0);
        assert_eq!(modulation_scale(2, 0.5, 0.0), 1.0);
    }

    #[test]
    fn total_ber_is_clamped_for_arbitrary_inputs() {
        let registry = ObjectRegistry::new(Vec::new());
        for (x, vx) in [(0.0, 0.0), (0.0, 1e6), (1e7, 0.0), (1.0, -1e6)] {
            let sender = moving_vehicle(1, 0.0, vx);
            let receiver = vehicle(2, x, 0.0);
            let ber = total_bit_error_rate(&sender, &receiver, &registry, 5.9e9, 6, 0.75, 1.0);
            assert!((0.0..=1.0).contains(&ber), "ber {ber} out of range for x={x} vx={vx}");
        }
    }

    #[test]
    fn success_probability_is_clamped_and_monotonic_in_ber() {
        assert_eq!(success_probability(0.0, 1000, 0.5), 0.0);
        assert_eq!(success_probability(1.0, 1000, 0.5), 1.0);
        let low = success_probability(1e-5, 1000, 0.5);
        let high = success_probability(1e-3, 1000, 0.5);
        assert!(low < high);
        assert!((0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high));
    }

    #[test]
    fn success_probability_guards_malformed_code_rate() {
        // Exponent falls back to the plain bit length.
        let guarded = success_probability(1e-3, 1000, 0.0);
        let plain = 1.0 - (1.0 - 1e-3f64).powf(1000.0);
        assert!((guarded - plain).abs() < 1e-12);
    }

    #[test]
    fn five_hundred_meter_link_is_nearly_certain() {
        // Two stationary vehicles 500 m apart, QPSK 1/2, 3200-bit payload:
        // the canonical short-range scenario must come out above 0.99.
        let sender = vehicle(1, 0.0, 0.0);
        let receiver = vehicle(2, 500.0, 0.0);
        let registry = ObjectRegistry::new(vec![sender.clone(), receiver.clone()]);
        let ber = total_bit_error_rate(&sender, &receiver, &registry, 5.9e9, 2, 0.5, 1.0);
        let success = success_probability(ber, 3200, 0.5);
        assert!(success > 0.99, "success {success}");
    }
}
