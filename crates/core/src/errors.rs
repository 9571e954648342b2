//! Core error types for the health monitoring engine.
//!
//! Errors raised inside the engine are absorbed where they occur and turned
//! into health data. The types here cover the few places where a failure is
//! returned to the caller: configuration validation, subscribing to a closed
//! stream, and the result type of collaborator-supplied checks.

use thiserror::Error;

use crate::health::HealthError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the health engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Health monitor error: {0}")]
    Health(#[from] HealthError),

    #[error("Failed to (de)serialize event payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Creates an `Unexpected` error from any displayable value.
    ///
    /// Convenient for check callbacks that wrap foreign errors.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
