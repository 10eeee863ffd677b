//! Movement smoothing and the run gait
//!
//! Two stages between the resolved force and the wire: the response curve
//! (magnitude shaping, direction preserved) and frame-rate-independent
//! interpolation toward the shaped target. The run gait is decided here
//! too, with watermark hysteresis so a magnitude hovering at the deadzone
//! cannot flicker the state.

use glam::Vec3;

use crate::config::MotionSettings;
use crate::math::{lerp, MOVEMENT_EPSILON};

/// Hysteresis band applied around the run deadzone.
pub const RUN_HYSTERESIS_BAND: f32 = 0.10;

/// Curve the force magnitude, preserving direction.
pub fn curve(force: Vec3, settings: &MotionSettings) -> Vec3 {
    let magnitude = force.length();
    if magnitude < MOVEMENT_EPSILON {
        return Vec3::ZERO;
    }
    let curved = settings.curve_type.apply(magnitude, settings.curve_exponent);
    let blended = lerp(magnitude, curved, settings.curve_smoothing);
    force / magnitude * blended
}

/// Step the carried movement toward `target`.
///
/// The step factor scales with the tick delta against the transition time
/// constant; with safety limits on, the per-axis change is additionally
/// clamped to the acceleration budget for this tick.
pub fn interpolate(current: Vec3, target: Vec3, settings: &MotionSettings, delta_time: f32) -> Vec3 {
    let transition = settings.state_transition_time.max(f32::EPSILON);
    let factor = (delta_time / transition).min(1.0) * settings.interpolation_strength;
    let mut next = current + (target - current) * factor;
    if settings.safety_limits_enabled {
        let max_step = Vec3::splat(settings.max_acceleration * delta_time);
        let step = (next - current).clamp(-max_step, max_step);
        next = current + step;
    }
    next
}

/// Decide the run gait from the resolved force magnitude.
///
/// Watermark hysteresis: engage above `deadzone * 1.1`, disengage at or
/// below `deadzone * 0.9`. Inside the band the previous gait holds.
pub fn update_run_gait(running: bool, magnitude: f32, run_deadzone: f32) -> bool {
    let enter = run_deadzone * (1.0 + RUN_HYSTERESIS_BAND);
    let exit = run_deadzone * (1.0 - RUN_HYSTERESIS_BAND);
    if running {
        magnitude > exit
    } else {
        magnitude > enter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CurveType;

    #[test]
    fn test_linear_curve_is_identity() {
        let settings = MotionSettings::default();
        let force = Vec3::new(0.3, 0.0, 0.4);
        assert!((curve(force, &settings) - force).length() < 1e-6);
    }

    #[test]
    fn test_quadratic_curve_softens_magnitude() {
        let settings = MotionSettings {
            curve_type: CurveType::Quadratic,
            curve_smoothing: 1.0,
            ..Default::default()
        };
        let force = Vec3::new(0.0, 0.0, 0.5);
        let shaped = curve(force, &settings);
        assert!((shaped.z - 0.25).abs() < 1e-6);
        assert_eq!(shaped.x, 0.0);
    }

    #[test]
    fn test_curve_blend_is_halfway() {
        let settings = MotionSettings {
            curve_type: CurveType::Quadratic,
            curve_smoothing: 0.5,
            ..Default::default()
        };
        let shaped = curve(Vec3::new(0.0, 0.0, 0.5), &settings);
        // Halfway between raw 0.5 and curved 0.25.
        assert!((shaped.z - 0.375).abs() < 1e-6);
    }

    #[test]
    fn test_curve_preserves_direction() {
        let settings = MotionSettings {
            curve_type: CurveType::Cubic,
            curve_smoothing: 1.0,
            ..Default::default()
        };
        let force = Vec3::new(0.6, 0.0, 0.8);
        let shaped = curve(force, &settings);
        let dot = shaped.normalize().dot(force.normalize());
        assert!((dot - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_near_zero_force_curves_to_zero() {
        let settings = MotionSettings::default();
        assert_eq!(curve(Vec3::splat(1e-6), &settings), Vec3::ZERO);
    }

    #[test]
    fn test_interpolate_converges() {
        let settings = MotionSettings {
            safety_limits_enabled: false,
            ..Default::default()
        };
        let target = Vec3::new(0.0, 0.0, 1.0);
        let mut movement = Vec3::ZERO;
        for _ in 0..600 {
            movement = interpolate(movement, target, &settings, 0.016);
        }
        assert!((movement - target).length() < 0.01, "at {movement}");
    }

    #[test]
    fn test_interpolate_instant_with_zero_transition() {
        let settings = MotionSettings {
            state_transition_time: 0.0,
            interpolation_strength: 1.0,
            safety_limits_enabled: false,
            ..Default::default()
        };
        let target = Vec3::new(0.0, 0.0, 0.5);
        let movement = interpolate(Vec3::ZERO, target, &settings, 0.016);
        assert_eq!(movement, target);
    }

    #[test]
    fn test_acceleration_clamps_step() {
        let settings = MotionSettings {
            state_transition_time: 0.0,
            interpolation_strength: 1.0,
            max_acceleration: 2.0,
            ..Default::default()
        };
        let target = Vec3::new(0.0, 0.0, 1.0);
        let movement = interpolate(Vec3::ZERO, target, &settings, 0.016);
        // One tick's acceleration budget: 2.0 * 0.016.
        assert!((movement.z - 0.032).abs() < 1e-6);
    }

    #[test]
    fn test_run_gait_no_flicker_inside_band() {
        let deadzone = 0.70;
        let mut running = false;
        let mut transitions = 0;
        for i in 0..100 {
            let magnitude = if i % 2 == 0 { 0.69 } else { 0.71 };
            let next = update_run_gait(running, magnitude, deadzone);
            if next != running {
                transitions += 1;
            }
            running = next;
        }
        assert_eq!(transitions, 0);
        assert!(!running);
    }

    #[test]
    fn test_run_gait_watermarks() {
        let deadzone = 0.8;
        // Engages only above the high watermark.
        assert!(!update_run_gait(false, 0.85, deadzone));
        assert!(update_run_gait(false, 0.89, deadzone));
        // Disengages only at or below the low watermark.
        assert!(update_run_gait(true, 0.75, deadzone));
        assert!(!update_run_gait(true, 0.70, deadzone));
    }

    #[test]
    fn test_run_gait_zero_deadzone_runs_while_pulled() {
        assert!(update_run_gait(false, 0.2, 0.0));
        assert!(!update_run_gait(true, 0.0, 0.0));
    }
}
