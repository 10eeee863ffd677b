//! Net force resolution
//!
//! Folds the raw directional pulls into one force vector per tick:
//! `(positive - negative) * stretch * strength`, with vertical shaping and
//! the per-axis safety clamp. Total over validated state; zero in means
//! zero out for any settings.

use std::time::Instant;

use glam::Vec3;

use crate::config::MotionSettings;
use crate::math::MOVEMENT_EPSILON;
use crate::state::MotionState;

/// Floor applied to the measured tick delta, seconds.
pub const MIN_TIME_STEP: f32 = 0.016;

/// Resolve the current force and tick delta.
///
/// Updates the state's monotonic reference as a side effect; the first
/// call after a reset uses the minimum time step.
pub fn resolve_force(state: &mut MotionState, settings: &MotionSettings, now: Instant) -> (Vec3, f32) {
    let delta_time = match state.last_update {
        Some(prev) => now
            .saturating_duration_since(prev)
            .as_secs_f32()
            .max(MIN_TIME_STEP),
        None => MIN_TIME_STEP,
    };
    state.last_update = Some(now);

    let mut force = state.net_force() * state.stretch * settings.strength_multiplier;
    force = shape_vertical(force, settings);
    if settings.safety_limits_enabled {
        let cap = Vec3::splat(settings.max_velocity);
        force = force.clamp(-cap, cap);
    }
    state.current_strength = force.length();
    (force, delta_time)
}

/// Vertical deadzone and up/down compensation.
///
/// A vertical component under the deadzone is dropped; above it, the
/// horizontal components are scaled by the compensation factor weighted
/// with the vertical share of the pull. Compensation 1.0 is neutral.
fn shape_vertical(mut force: Vec3, settings: &MotionSettings) -> Vec3 {
    let magnitude = force.length();
    if magnitude < MOVEMENT_EPSILON {
        return force;
    }
    if force.y.abs() < settings.up_down_deadzone {
        force.y = 0.0;
    } else {
        let vertical_ratio = force.y.abs() / magnitude;
        let scale =
            (1.0 + (settings.up_down_compensation - 1.0) * vertical_ratio).clamp(0.0, 2.0);
        force.x *= scale;
        force.z *= scale;
    }
    force
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{ForceChannel, SignalRole, SignalValue};

    fn pulled_state(z_positive: f32, stretch: f32) -> MotionState {
        let mut state = MotionState::new();
        state.apply(SignalRole::Grab, SignalValue::Bool(true));
        state.apply(SignalRole::Stretch, SignalValue::Float(stretch));
        state.apply(
            SignalRole::Force(ForceChannel::ZPositive),
            SignalValue::Float(z_positive),
        );
        state
    }

    #[test]
    fn test_zero_force_stays_zero() {
        let mut state = MotionState::new();
        state.apply(SignalRole::Grab, SignalValue::Bool(true));
        for settings in [
            MotionSettings::default(),
            MotionSettings {
                strength_multiplier: 2.0,
                safety_limits_enabled: false,
                ..Default::default()
            },
        ] {
            let (force, _) = resolve_force(&mut state, &settings, Instant::now());
            assert_eq!(force, Vec3::ZERO);
        }
    }

    #[test]
    fn test_force_product() {
        let mut state = pulled_state(1.0, 0.5);
        let settings = MotionSettings {
            safety_limits_enabled: false,
            ..Default::default()
        };
        let (force, _) = resolve_force(&mut state, &settings, Instant::now());
        assert_eq!(force, Vec3::new(0.0, 0.0, 0.5));
        assert!((state.current_strength - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_first_resolve_uses_time_floor() {
        let mut state = pulled_state(1.0, 1.0);
        let settings = MotionSettings::default();
        let (_, delta) = resolve_force(&mut state, &settings, Instant::now());
        assert_eq!(delta, MIN_TIME_STEP);
        assert!(state.last_update.is_some());
    }

    #[test]
    fn test_delta_never_below_floor() {
        let mut state = pulled_state(1.0, 1.0);
        let settings = MotionSettings::default();
        let now = Instant::now();
        resolve_force(&mut state, &settings, now);
        // Same instant again: measured delta is zero, floor applies.
        let (_, delta) = resolve_force(&mut state, &settings, now);
        assert_eq!(delta, MIN_TIME_STEP);
    }

    #[test]
    fn test_safety_clamps_each_axis() {
        let mut state = pulled_state(1.0, 1.0);
        let settings = MotionSettings {
            strength_multiplier: 2.0,
            max_velocity: 1.0,
            ..Default::default()
        };
        let (force, _) = resolve_force(&mut state, &settings, Instant::now());
        assert_eq!(force.z, 1.0);

        let no_clamp = MotionSettings {
            safety_limits_enabled: false,
            ..settings
        };
        let (force, _) = resolve_force(&mut state, &no_clamp, Instant::now());
        assert_eq!(force.z, 2.0);
    }

    #[test]
    fn test_vertical_deadzone_drops_y() {
        let mut state = MotionState::new();
        state.apply(SignalRole::Grab, SignalValue::Bool(true));
        state.apply(SignalRole::Stretch, SignalValue::Float(1.0));
        state.apply(
            SignalRole::Force(ForceChannel::YPositive),
            SignalValue::Float(0.05),
        );
        state.apply(
            SignalRole::Force(ForceChannel::ZPositive),
            SignalValue::Float(0.5),
        );
        let settings = MotionSettings::default();
        let (force, _) = resolve_force(&mut state, &settings, Instant::now());
        assert_eq!(force.y, 0.0);
        assert!((force.z - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_compensation_neutral_at_default() {
        let mut state = MotionState::new();
        state.apply(SignalRole::Grab, SignalValue::Bool(true));
        state.apply(SignalRole::Stretch, SignalValue::Float(1.0));
        state.apply(
            SignalRole::Force(ForceChannel::YPositive),
            SignalValue::Float(0.5),
        );
        state.apply(
            SignalRole::Force(ForceChannel::ZPositive),
            SignalValue::Float(0.5),
        );
        let settings = MotionSettings {
            safety_limits_enabled: false,
            ..Default::default()
        };
        let (force, _) = resolve_force(&mut state, &settings, Instant::now());
        assert!((force.z - 0.5).abs() < 1e-6);
        assert!((force.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_compensation_scales_horizontals() {
        let mut state = MotionState::new();
        state.apply(SignalRole::Grab, SignalValue::Bool(true));
        state.apply(SignalRole::Stretch, SignalValue::Float(1.0));
        state.apply(
            SignalRole::Force(ForceChannel::YPositive),
            SignalValue::Float(0.5),
        );
        state.apply(
            SignalRole::Force(ForceChannel::ZPositive),
            SignalValue::Float(0.5),
        );
        let settings = MotionSettings {
            up_down_compensation: 2.0,
            safety_limits_enabled: false,
            ..Default::default()
        };
        let (force, _) = resolve_force(&mut state, &settings, Instant::now());
        // Vertical share is 1/sqrt(2); horizontals gain that fraction.
        let expected = 0.5 * (1.0 + 0.5f32.sqrt());
        assert!((force.z - expected).abs() < 1e-5, "got {}", force.z);
        assert!((force.y - 0.5).abs() < 1e-6);
    }
}
