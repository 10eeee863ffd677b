//! Error types for the leash engine
//!
//! Errors live at the boundaries of the crate: sample validation, the
//! output sinks, configuration, and engine lifecycle. The resolution
//! pipeline itself is total over validated inputs and never fails.

use thiserror::Error;

/// Result type alias for leash engine operations
pub type Result<T> = std::result::Result<T, LeashError>;

/// Main error type for the leash engine
#[derive(Error, Debug)]
pub enum LeashError {
    /// A sample failed validation and was discarded
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    /// The bounded signal queue rejected a sample
    #[error("Signal queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// An output sink rejected an emission
    #[error("Sink error: {0}")]
    Sink(String),

    /// Configuration failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine lifecycle misuse
    #[error("Engine error: {0}")]
    Engine(String),
}
