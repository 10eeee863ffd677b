//! Turn angle resolution
//!
//! Converts the resolved force into a smoothed turn command, in degrees
//! throughout: raw angle from atan2, multiplier and goal clamp, facing
//! offset, then momentum and shortest-arc interpolation. The facing offset
//! is applied after the goal clamp so opposite facings stay exact
//! negations of each other.

use glam::Vec3;

use crate::config::MotionSettings;
use crate::math::{lerp_angle, wrap_degrees};
use crate::signal::LeashDirection;
use crate::state::{MotionState, StateFlags};

/// Resolve this tick's turn command.
///
/// Returns 0 and fully resets the turn fields when turning is disabled or
/// the force magnitude sits at or below the turning deadzone.
pub fn resolve_turn(
    state: &mut MotionState,
    force: Vec3,
    facing: LeashDirection,
    settings: &MotionSettings,
    delta_time: f32,
) -> f32 {
    if !settings.turning_enabled || force.length() <= settings.turning_deadzone {
        state.flags.set(StateFlags::TURNING, false);
        state.current_turn_angle = 0.0;
        state.target_turn_angle = 0.0;
        state.turning_momentum = 0.0;
        return 0.0;
    }

    let raw = force.x.atan2(force.z).to_degrees();
    let scaled =
        (raw * settings.turning_multiplier).clamp(-settings.turning_goal, settings.turning_goal);
    let target = apply_facing(scaled, facing);

    let previous = state.current_turn_angle;
    state.target_turn_angle = target;
    state.turning_momentum = lerp_angle(
        state.turning_momentum,
        wrap_degrees(target - previous) * settings.turning_momentum,
        delta_time,
    );
    let mut angle = lerp_angle(previous, target, settings.smooth_turning_speed * delta_time)
        + state.turning_momentum;
    if settings.safety_limits_enabled {
        let max_step = settings.max_turn_rate * delta_time;
        angle = previous + wrap_degrees(angle - previous).clamp(-max_step, max_step);
    }
    state.current_turn_angle = angle;
    state.flags.set(StateFlags::TURNING, true);
    angle
}

/// Rotate a turn target into the anchor's facing.
pub fn apply_facing(angle: f32, facing: LeashDirection) -> f32 {
    match facing {
        LeashDirection::North | LeashDirection::None => angle,
        LeashDirection::South => -angle,
        LeashDirection::East => angle - 90.0,
        LeashDirection::West => angle + 90.0,
    }
}
