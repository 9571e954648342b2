//! Topics and payloads exchanged with the event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::health::{AggregateSnapshot, HealthStatus, HealthSummary};

/// Published when a component's status differs from its previous status.
pub const HEALTH_COMPONENT_CHANGED: &str = "health.component.changed";
/// Published on every aggregate recomputation.
pub const HEALTH_OVERALL_UPDATED: &str = "health.overall.updated";
/// Consumed: a collaborator observed an error in a component.
pub const ERROR_OCCURRED: &str = "error.occurred";
/// Consumed: a collaborator observed a component recover.
pub const COMPONENT_RECOVERED: &str = "component.recovered";

/// Payload of [`HEALTH_COMPONENT_CHANGED`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentChangedPayload {
    pub component_id: String,
    pub previous_status: HealthStatus,
    pub new_status: HealthStatus,
    pub message: Option<String>,
}

/// Payload of [`HEALTH_OVERALL_UPDATED`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallUpdatedPayload {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub summary: HealthSummary,
}

impl From<&AggregateSnapshot> for OverallUpdatedPayload {
    fn from(snapshot: &AggregateSnapshot) -> Self {
        Self {
            status: snapshot.status,
            timestamp: snapshot.timestamp,
            summary: snapshot.summary,
        }
    }
}

/// Payload of [`ERROR_OCCURRED`].
///
/// `error` is whatever the publisher attached; only its text is used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOccurredPayload {
    #[serde(default)]
    pub component_id: Option<String>,
    #[serde(default)]
    pub error: Value,
}

impl ErrorOccurredPayload {
    /// Text form of the error value. Strings are used verbatim.
    pub fn error_text(&self) -> String {
        match &self.error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Payload of [`COMPONENT_RECOVERED`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecoveredPayload {
    #[serde(default)]
    pub component_id: Option<String>,
}
