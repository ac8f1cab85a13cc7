//! Error types for the simulation engine

use thiserror::Error;

/// Simulation engine result type
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Errors raised while configuring or exporting a simulation.
///
/// Ticking the simulation itself never fails: out-of-range values are
/// clamped, not rejected.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SimulationError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
