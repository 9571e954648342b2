//! Health monitor error types.
//!
//! This module defines health-specific errors that can occur during check
//! execution, configuration and stream subscription.

use std::time::Duration;

use thiserror::Error;

/// Errors specific to health monitor operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HealthError {
    /// A health check callback reported a failure.
    #[error("Health check for '{component_id}' failed: {message}")]
    CheckFailed {
        component_id: String,
        message: String,
    },

    /// A health check callback did not finish within the component timeout.
    #[error("Health check for '{component_id}' timed out after {}ms", timeout.as_millis())]
    CheckTimedOut {
        component_id: String,
        timeout: Duration,
    },

    /// Configuration validation error.
    #[error("Invalid health monitor configuration: {0}")]
    InvalidConfig(String),

    /// The health stream was closed by `dispose` and not reopened.
    #[error("Health stream is closed")]
    StreamClosed,

    /// The component is not present in the registry.
    #[error("Unknown component: {0}")]
    UnknownComponent(String),
}

impl HealthError {
    /// Creates a CheckFailed error.
    pub fn check_failed(component_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CheckFailed {
            component_id: component_id.into(),
            message: message.into(),
        }
    }

    /// Creates a CheckTimedOut error.
    pub fn timed_out(component_id: impl Into<String>, timeout: Duration) -> Self {
        Self::CheckTimedOut {
            component_id: component_id.into(),
            timeout,
        }
    }
}
