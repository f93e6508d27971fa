//! Engine error types
//!
//! None of these abort a compile cycle. Registration and provider errors
//! are logged and recorded; only configuration and scenario storage errors
//! reach the caller as `Err`.

use planboard_ids::ScenarioId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unusable module id at registration time. The registration is
    /// ignored and the caller gets an inert handle.
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Invalid horizon: {0}")]
    InvalidHorizon(String),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// A provider failed to produce a usable result. Its contribution is
/// treated as absent for that cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Provider failed: {0}")]
    Execution(String),

    #[error("Provider panicked: {0}")]
    Panicked(String),

    #[error("Malformed result: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Scenario not found: {0}")]
    NotFound(ScenarioId),

    #[error("Scenario storage error: {0}")]
    Storage(String),

    #[error("Scenario serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::io::Error> for ScenarioError {
    fn from(err: std::io::Error) -> Self {
        ScenarioError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
