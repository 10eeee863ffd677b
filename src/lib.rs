//! # oscleash: leash-driven motion resolution
//!
//! Converts the noisy, independently-arriving pull signals of a physical
//! leash prop (six directional strains, a grab flag, a stretch magnitude)
//! into a continuous, smoothed locomotion command for a remote-controlled
//! actor: forward/back, strafe, turn rate and the run gait.
//!
//! Transport callbacks [`LeashEngine::submit`] samples into a bounded
//! queue; one consumer thread drains them in batches, folds them into the
//! motion state, resolves net force and turn angle, smooths both, and
//! dispatches change-gated outputs through a primary actor handle with a
//! named-parameter fallback.
//!
//! This crate provides:
//! - Bounded multi-producer signal intake with overflow drop
//! - Validated state mutation (grab, stretch, directional pulls, facing)
//! - Force resolution with vertical shaping and safety clamps
//! - Facing-aware turn resolution with momentum smoothing
//! - Response curves, interpolation and run-gait hysteresis
//! - Fault-tolerant output dispatch with deferred gait-change emission

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod math;
pub mod movement;
pub mod queue;
pub mod signal;
pub mod smoothing;
pub mod state;
pub mod turning;

// Re-exports for convenience
pub use config::{CurveType, EngineConfig, MotionSettings};
pub use dispatch::{ActorHandle, OutputDispatcher, OutputFrame, ParameterWriter};
pub use engine::{LeashEngine, StatsSnapshot};
pub use error::{LeashError, Result};
pub use signal::{
    FacingPoint, ForceChannel, LeashDirection, SignalRole, SignalSample, SignalValue,
};
pub use state::{MotionState, StateFlags};

/// Version of the oscleash library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
