//! Geometry calculations for the propagation model.
//!
//! Contains helper functions for:
//! - Distance calculations (squared distance to avoid sqrt in hot paths)
//! - Velocity components along the sender/receiver line of sight
//! - Nearest approach of an object to a sampled straight-line path

use crate::types::Vec2;

/// Squared Euclidean distance in meters (avoids a sqrt in hot paths).
///
/// Range checks compare d1² against d2², so the square root is only taken
/// once a real distance is needed for the error model.
pub fn distance2(a: &Vec2, b: &Vec2) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Euclidean distance in meters.
pub fn distance(a: &Vec2, b: &Vec2) -> f64 {
    distance2(a, b).sqrt()
}

/// Component of `velocity` along the line of sight from `from` towards `to`,
/// in meters per second. Positive values move towards `to`.
///
/// Computed via the angle between the velocity vector and the line of sight,
/// which collapses to a normalized dot product. Degenerate inputs (zero-length
/// line of sight or zero velocity) contribute nothing rather than producing
/// NaN.
pub fn velocity_along_line(velocity: &Vec2, from: &Vec2, to: &Vec2) -> f64 {
    let line = Vec2::new(to.x - from.x, to.y - from.y);
    let line_len = line.magnitude();
    if line_len == 0.0 {
        return 0.0;
    }
    let speed = velocity.magnitude();
    if speed == 0.0 {
        return 0.0;
    }
    let cos_angle = velocity.dot(&line) / (speed * line_len);
    speed * cos_angle
}

/// Nearest approach of `point` to `samples` equally spaced positions along
/// the segment `from`→`to`, in meters.
///
/// This is the sampled-path scan used by the multipath model: instead of an
/// exact point-to-segment distance the path is probed at discrete points, so
/// an object between two probes may read slightly farther than its true
/// perpendicular distance. The sampling resolution is part of the model's
/// observable behavior and must not be "improved" silently.
pub fn nearest_approach_to_sampled_path(point: &Vec2, from: &Vec2, to: &Vec2, samples: usize) -> f64 {
    if samples == 0 {
        return distance(point, from);
    }
    let step_x = (to.x - from.x) / samples as f64;
    let step_y = (to.y - from.y) / samples as f64;
    let mut nearest = f64::INFINITY;
    for i in 0..=samples {
        let sample = Vec2::new(from.x + step_x * i as f64, from.y + step_y * i as f64);
        let d = distance(point, &sample);
        if d < nearest {
            nearest = d;
        }
    }
    nearest
}
