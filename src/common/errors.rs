//! Error types for the engine

use thiserror::Error;

use crate::lifecycle::types::StateAnomaly;

/// Result type alias using our EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine operations
///
/// Every variant is scoped to a single alert or a single evaluation cycle;
/// none of them is fatal to the process.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or incomplete model output
    #[error("Validation error: {0}")]
    Validation(String),

    /// Timeout or transport failure talking to the language-model gateway
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// A stop move or status transition that would break monotonicity
    #[error("State anomaly: {0}")]
    StateAnomaly(StateAnomaly),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// True when the failure is recoverable by retrying or skipping the cycle
    pub fn is_gateway(&self) -> bool {
        matches!(self, EngineError::Gateway(_))
    }

    /// True when the model output was rejected at the validation boundary
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EngineError::Gateway(format!("request timed out: {}", err))
        } else {
            EngineError::Gateway(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Validation(format!("invalid JSON: {}", err))
    }
}

impl From<StateAnomaly> for EngineError {
    fn from(anomaly: StateAnomaly) -> Self {
        EngineError::StateAnomaly(anomaly)
    }
}
