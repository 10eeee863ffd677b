//! Scalar helpers shared by the resolvers
//!
//! Angle math is in degrees throughout; wrapping keeps interpolation on
//! the shortest arc so a step from 170 to -170 passes through 180.

/// Values closer to zero than this are treated as no movement.
pub const MOVEMENT_EPSILON: f32 = 1e-4;

/// Linear interpolation between `a` and `b` by `t`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Wrap an angle difference into the [-180, 180) range.
pub fn wrap_degrees(delta: f32) -> f32 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Angle interpolation in degrees taking the shortest arc.
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    a + wrap_degrees(b - a) * t
}

/// Clamp a locomotion axis to [-1, 1], treating non-finite input as zero.
pub fn clamp_axis(value: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(-1.0, 1.0)
}

/// Replace a non-finite value with zero.
pub fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
