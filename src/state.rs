//! Motion state
//!
//! One mutable `MotionState` per session, owned by the consumer loop and
//! mutated only under its write lock. Everything in it is derived from
//! validated samples and the resolvers; a reset returns it to the all-zero
//! idle state.

use std::time::Instant;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::signal::{ForceChannel, SignalRole, SignalValue};

/// Orthogonal motion flags packed into one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateFlags(u8);

impl StateFlags {
    /// Leash is currently grabbed.
    pub const GRABBED: StateFlags = StateFlags(1 << 0);
    /// Nonzero pull forces are present.
    pub const MOVING: StateFlags = StateFlags(1 << 1);
    /// Turn pipeline was active on the last tick.
    pub const TURNING: StateFlags = StateFlags(1 << 2);
    /// Run gait engaged.
    pub const RUNNING: StateFlags = StateFlags(1 << 3);

    /// No flags set.
    pub const fn empty() -> Self {
        StateFlags(0)
    }

    /// True when `flag` is set.
    pub fn contains(self, flag: StateFlags) -> bool {
        self.0 & flag.0 != 0
    }

    /// Set or clear `flag`.
    pub fn set(&mut self, flag: StateFlags, on: bool) {
        if on {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }

    /// Clear every flag.
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// True when no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Outcome of applying one validated sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Leash was grabbed.
    Grabbed,
    /// Leash was released; the state has been reset.
    Released,
    /// A scalar field was stored.
    Updated,
}

/// Mutable per-session motion state.
#[derive(Debug, Clone)]
pub struct MotionState {
    /// Pull strength toward +x/+y/+z, each component >= 0.
    pub positive_forces: Vec3,
    /// Pull strength toward -x/-y/-z, each component >= 0.
    pub negative_forces: Vec3,
    /// Physbone stretch magnitude in [0, 1].
    pub stretch: f32,
    /// Smoothed turn angle carried between ticks, degrees.
    pub current_turn_angle: f32,
    /// Turn target of the last active tick, degrees.
    pub target_turn_angle: f32,
    /// Momentum term folded into the turn angle, degrees.
    pub turning_momentum: f32,
    /// Smoothed movement carried between ticks.
    pub current_movement: Vec3,
    /// Resolved force magnitude of the last tick.
    pub current_strength: f32,
    /// Monotonic instant of the last force resolution.
    pub last_update: Option<Instant>,
    /// Grab/move/turn/run flags.
    pub flags: StateFlags,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            positive_forces: Vec3::ZERO,
            negative_forces: Vec3::ZERO,
            stretch: 0.0,
            current_turn_angle: 0.0,
            target_turn_angle: 0.0,
            turning_momentum: 0.0,
            current_movement: Vec3::ZERO,
            current_strength: 0.0,
            last_update: None,
            flags: StateFlags::empty(),
        }
    }
}

impl MotionState {
    /// Fresh all-zero state.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the leash is grabbed.
    pub fn is_grabbed(&self) -> bool {
        self.flags.contains(StateFlags::GRABBED)
    }

    /// True while pull forces are present.
    pub fn is_moving(&self) -> bool {
        self.flags.contains(StateFlags::MOVING)
    }

    /// Net force before stretch and strength scaling.
    pub fn net_force(&self) -> Vec3 {
        self.positive_forces - self.negative_forces
    }

    /// Apply a validated sample.
    ///
    /// Facing samples never reach this; the engine routes them to the
    /// facing point instead.
    pub fn apply(&mut self, role: SignalRole, value: SignalValue) -> Applied {
        match (role, value) {
            (SignalRole::Grab, SignalValue::Bool(grabbed)) => self.apply_grab(grabbed),
            (SignalRole::Stretch, SignalValue::Float(v)) => {
                self.stretch = v.clamp(0.0, 1.0);
                Applied::Updated
            }
            (SignalRole::Force(channel), SignalValue::Float(v)) => {
                self.apply_force(channel, v.max(0.0));
                Applied::Updated
            }
            // Validation screens kind mismatches before samples get here.
            _ => {
                debug_assert!(
                    false,
                    "kind mismatch reached apply: {role:?} with {}",
                    value.kind()
                );
                Applied::Updated
            }
        }
    }

    /// Zero everything: forces, stretch, movement, turn fields, flags.
    ///
    /// Idempotent; used on release, actor change and engine stop.
    pub fn reset(&mut self) {
        *self = MotionState::default();
    }

    fn apply_grab(&mut self, grabbed: bool) -> Applied {
        if self.is_grabbed() == grabbed {
            return Applied::Updated;
        }
        if grabbed {
            self.flags.set(StateFlags::GRABBED, true);
            // A fresh grab counts as moving until forces say otherwise.
            self.flags.set(StateFlags::MOVING, true);
            Applied::Grabbed
        } else {
            self.reset();
            Applied::Released
        }
    }

    fn apply_force(&mut self, channel: ForceChannel, value: f32) {
        match channel {
            ForceChannel::XPositive => self.positive_forces.x = value,
            ForceChannel::XNegative => self.negative_forces.x = value,
            ForceChannel::YPositive => self.positive_forces.y = value,
            ForceChannel::YNegative => self.negative_forces.y = value,
            ForceChannel::ZPositive => self.positive_forces.z = value,
            ForceChannel::ZNegative => self.negative_forces.z = value,
        }
        if self.is_grabbed() {
            let moving = self.positive_forces != Vec3::ZERO || self.negative_forces != Vec3::ZERO;
            self.flags.set(StateFlags::MOVING, moving);
        }
    }
}
