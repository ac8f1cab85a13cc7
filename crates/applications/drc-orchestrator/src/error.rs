//! Error types for the orchestrator

use drc_core::DrcError;
use drc_simulation_engine::SimulationError;
use thiserror::Error;

/// Orchestrator result type
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors that can occur in the orchestrator
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error surfaced through a core trait
    #[error(transparent)]
    Core(#[from] DrcError),

    /// Simulation setup error
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// SMS endpoint rejected the request
    #[error("SMS error: {0}")]
    Sms(String),

    /// Invalid input
    #[error("Validation error: {0}")]
    Validation(String),
}

impl OrchestratorError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an SMS error
    pub fn sms(msg: impl Into<String>) -> Self {
        Self::Sms(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<OrchestratorError> for DrcError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Core(inner) => inner,
            OrchestratorError::Config(msg) => DrcError::Config(msg),
            OrchestratorError::Validation(msg) => DrcError::Validation(msg),
            OrchestratorError::Sms(msg) => DrcError::Gateway(msg),
            other => DrcError::Network(other.to_string()),
        }
    }
}
