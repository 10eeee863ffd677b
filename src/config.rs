//! Engine configuration
//!
//! `MotionSettings` is the hot-reloadable tuning snapshot: replaced
//! wholesale, never patched field by field, and clamped into valid ranges
//! at the boundary. `EngineConfig` holds construction-time plumbing knobs
//! that do not change while the engine runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LeashError, Result};
use crate::signal::LeashDirection;

/// Response curve applied to the resolved force magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurveType {
    /// Pass-through.
    #[default]
    Linear,
    /// Squared magnitude, softer near the center.
    Quadratic,
    /// Cubed magnitude.
    Cubic,
    /// Magnitude raised to the configured exponent.
    Exponential,
}

impl CurveType {
    /// Apply the curve to a non-negative magnitude.
    pub fn apply(self, magnitude: f32, exponent: f32) -> f32 {
        match self {
            CurveType::Linear => magnitude,
            CurveType::Quadratic => magnitude * magnitude,
            CurveType::Cubic => magnitude * magnitude * magnitude,
            CurveType::Exponential => magnitude.powf(exponent),
        }
    }
}

/// Tunable motion settings, replaced as one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSettings {
    /// Base name grouping this leash's signals.
    pub base_name: String,
    /// Configured anchor facing, used until signals carry their own.
    pub facing: LeashDirection,
    /// Smoothed magnitude below which no movement is emitted.
    pub walk_deadzone: f32,
    /// Force magnitude around which the run gait toggles.
    pub run_deadzone: f32,
    /// Scale applied to the net pull force.
    pub strength_multiplier: f32,
    /// Master switch for the turning pipeline.
    pub turning_enabled: bool,
    /// Scale applied to the raw turn angle.
    pub turning_multiplier: f32,
    /// Force magnitude that must be exceeded before turning engages.
    pub turning_deadzone: f32,
    /// Bound on the scaled turn target, degrees.
    pub turning_goal: f32,
    /// Turn angle interpolation rate, per second.
    pub smooth_turning_speed: f32,
    /// Carry-over factor for turn momentum.
    pub turning_momentum: f32,
    /// Horizontal scale while pulling vertically; 1.0 is neutral.
    pub up_down_compensation: f32,
    /// Vertical pull below which the y component is ignored.
    pub up_down_deadzone: f32,
    /// Master switch for velocity, acceleration and turn-rate clamps.
    pub safety_limits_enabled: bool,
    /// Per-axis bound on the resolved force.
    pub max_velocity: f32,
    /// Per-axis bound on movement change per second.
    pub max_acceleration: f32,
    /// Bound on turn angle change, degrees per second.
    pub max_turn_rate: f32,
    /// Response curve applied to the force magnitude.
    pub curve_type: CurveType,
    /// Exponent for [`CurveType::Exponential`].
    pub curve_exponent: f32,
    /// Blend between raw (0.0) and curved (1.0) magnitude.
    pub curve_smoothing: f32,
    /// Strength of movement interpolation.
    pub interpolation_strength: f32,
    /// Time constant for movement transitions, seconds.
    pub state_transition_time: f32,
    /// Emit per-sample diagnostics at debug level.
    pub debug_logging: bool,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            base_name: "Leash".to_string(),
            facing: LeashDirection::North,
            walk_deadzone: 0.1,
            run_deadzone: 0.8,
            strength_multiplier: 1.0,
            turning_enabled: true,
            turning_multiplier: 1.0,
            turning_deadzone: 0.1,
            turning_goal: 90.0,
            smooth_turning_speed: 0.5,
            turning_momentum: 0.3,
            up_down_compensation: 1.0,
            up_down_deadzone: 0.1,
            safety_limits_enabled: true,
            max_velocity: 1.0,
            max_acceleration: 2.0,
            max_turn_rate: 180.0,
            curve_type: CurveType::Linear,
            curve_exponent: 2.0,
            curve_smoothing: 0.5,
            interpolation_strength: 0.5,
            state_transition_time: 0.2,
            debug_logging: false,
        }
    }
}

impl MotionSettings {
    /// Validate all fields against their ranges.
    pub fn validate(&self) -> Result<()> {
        if self.base_name.is_empty() {
            return Err(LeashError::Config("base_name must not be empty".into()));
        }
        check_range("walk_deadzone", self.walk_deadzone, 0.0, 1.0)?;
        check_range("run_deadzone", self.run_deadzone, 0.0, 1.0)?;
        if self.run_deadzone < self.walk_deadzone {
            return Err(LeashError::Config(
                "run_deadzone must not be below walk_deadzone".into(),
            ));
        }
        check_range("strength_multiplier", self.strength_multiplier, 0.0, 2.0)?;
        check_range("turning_multiplier", self.turning_multiplier, 0.0, 2.0)?;
        check_range("turning_deadzone", self.turning_deadzone, 0.0, 1.0)?;
        check_range("turning_goal", self.turning_goal, 0.0, 180.0)?;
        check_range("smooth_turning_speed", self.smooth_turning_speed, 0.0, 1.0)?;
        check_range("turning_momentum", self.turning_momentum, 0.0, 1.0)?;
        check_range("up_down_compensation", self.up_down_compensation, 0.0, 2.0)?;
        check_range("up_down_deadzone", self.up_down_deadzone, 0.0, 1.0)?;
        check_range("max_velocity", self.max_velocity, 0.0, 2.0)?;
        check_range("max_acceleration", self.max_acceleration, 0.0, 5.0)?;
        check_range("max_turn_rate", self.max_turn_rate, 0.0, 360.0)?;
        check_range("curve_exponent", self.curve_exponent, 1.0, 5.0)?;
        check_range("curve_smoothing", self.curve_smoothing, 0.0, 1.0)?;
        check_range(
            "interpolation_strength",
            self.interpolation_strength,
            0.0,
            1.0,
        )?;
        check_range(
            "state_transition_time",
            self.state_transition_time,
            0.0,
            1.0,
        )?;
        Ok(())
    }

    /// Copy with every field clamped into its valid range.
    ///
    /// Non-finite values fall back to the defaults; run_deadzone is raised
    /// to walk_deadzone when the two cross.
    pub fn sanitized(&self) -> Self {
        let defaults = MotionSettings::default();
        let mut out = self.clone();
        if out.base_name.is_empty() {
            out.base_name = defaults.base_name;
        }
        out.walk_deadzone = clamp_field(self.walk_deadzone, 0.0, 1.0, defaults.walk_deadzone);
        out.run_deadzone = clamp_field(self.run_deadzone, 0.0, 1.0, defaults.run_deadzone)
            .max(out.walk_deadzone);
        out.strength_multiplier = clamp_field(
            self.strength_multiplier,
            0.0,
            2.0,
            defaults.strength_multiplier,
        );
        out.turning_multiplier = clamp_field(
            self.turning_multiplier,
            0.0,
            2.0,
            defaults.turning_multiplier,
        );
        out.turning_deadzone =
            clamp_field(self.turning_deadzone, 0.0, 1.0, defaults.turning_deadzone);
        out.turning_goal = clamp_field(self.turning_goal, 0.0, 180.0, defaults.turning_goal);
        out.smooth_turning_speed = clamp_field(
            self.smooth_turning_speed,
            0.0,
            1.0,
            defaults.smooth_turning_speed,
        );
        out.turning_momentum =
            clamp_field(self.turning_momentum, 0.0, 1.0, defaults.turning_momentum);
        out.up_down_compensation = clamp_field(
            self.up_down_compensation,
            0.0,
            2.0,
            defaults.up_down_compensation,
        );
        out.up_down_deadzone =
            clamp_field(self.up_down_deadzone, 0.0, 1.0, defaults.up_down_deadzone);
        out.max_velocity = clamp_field(self.max_velocity, 0.0, 2.0, defaults.max_velocity);
        out.max_acceleration =
            clamp_field(self.max_acceleration, 0.0, 5.0, defaults.max_acceleration);
        out.max_turn_rate = clamp_field(self.max_turn_rate, 0.0, 360.0, defaults.max_turn_rate);
        out.curve_exponent = clamp_field(self.curve_exponent, 1.0, 5.0, defaults.curve_exponent);
        out.curve_smoothing =
            clamp_field(self.curve_smoothing, 0.0, 1.0, defaults.curve_smoothing);
        out.interpolation_strength = clamp_field(
            self.interpolation_strength,
            0.0,
            1.0,
            defaults.interpolation_strength,
        );
        out.state_transition_time = clamp_field(
            self.state_transition_time,
            0.0,
            1.0,
            defaults.state_transition_time,
        );
        out
    }
}

/// Construction-time engine plumbing, not hot-reloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bounded queue capacity; samples beyond it are dropped.
    pub queue_capacity: usize,
    /// Most samples consumed per tick.
    pub batch_size: usize,
    /// Consumer tick interval.
    pub tick_interval: Duration,
    /// Minimum change before an analog channel is re-emitted.
    pub emit_threshold: f32,
    /// Settle delay between a gait change and the deferred axis values.
    pub run_transition_delay: Duration,
    /// Cache updates between eviction sweeps.
    pub cache_cleanup_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            batch_size: 10,
            tick_interval: Duration::from_millis(20),
            emit_threshold: 0.01,
            run_transition_delay: Duration::from_millis(16),
            cache_cleanup_interval: 1000,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(LeashError::Config("queue_capacity must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(LeashError::Config("batch_size must be > 0".into()));
        }
        if self.tick_interval.is_zero() {
            return Err(LeashError::Config("tick_interval must be > 0".into()));
        }
        if !self.emit_threshold.is_finite() || !(0.0..=0.1).contains(&self.emit_threshold) {
            return Err(LeashError::Config(
                "emit_threshold must be in [0.0, 0.1]".into(),
            ));
        }
        if self.cache_cleanup_interval == 0 {
            return Err(LeashError::Config(
                "cache_cleanup_interval must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn check_range(name: &str, value: f32, low: f32, high: f32) -> Result<()> {
    if !value.is_finite() || value < low || value > high {
        return Err(LeashError::Config(format!(
            "{name} must be in [{low}, {high}], got {value}"
        )));
    }
    Ok(())
}

fn clamp_field(value: f32, low: f32, high: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(low, high)
}
