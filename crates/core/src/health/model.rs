//! Health monitor domain models.
//!
//! This module contains the core data structures of the health engine:
//! - Status levels reported by components and derived for the system
//! - The per-component health record
//! - The aggregated snapshot pushed to observers
//! - The report produced by a health check callback

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Opaque key/value data attached to a component record.
///
/// Passed through unexamined by the engine.
pub type Metadata = HashMap<String, Value>;

// =============================================================================
// Health Status
// =============================================================================

/// Operational status of a component or of the whole system.
///
/// Ordered from best to worst: Healthy < Degraded < Unhealthy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// All status values, best first.
    pub const ALL: [HealthStatus; 3] = [
        HealthStatus::Healthy,
        HealthStatus::Degraded,
        HealthStatus::Unhealthy,
    ];

    /// Returns the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "healthy" => Ok(HealthStatus::Healthy),
            "degraded" => Ok(HealthStatus::Degraded),
            "unhealthy" => Ok(HealthStatus::Unhealthy),
            other => Err(format!("unknown health status: {other}")),
        }
    }
}

// =============================================================================
// Component Health
// =============================================================================

/// Current health record of a single component.
///
/// Records are never mutated in place; every update replaces the record
/// wholesale with a freshly timestamped one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub component_id: String,
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the status was last assigned.
    pub last_check: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl ComponentHealth {
    /// Creates a record stamped with the current time.
    pub fn new(
        component_id: impl Into<String>,
        status: HealthStatus,
        message: Option<String>,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            component_id: component_id.into(),
            status,
            message,
            last_check: Utc::now(),
            metadata,
        }
    }

    /// Initial record inserted by `register_component`.
    pub fn registered(component_id: impl Into<String>) -> Self {
        Self::new(
            component_id,
            HealthStatus::Healthy,
            Some("registered".to_string()),
            None,
        )
    }
}

// =============================================================================
// Summary & Snapshot
// =============================================================================

/// Number of components at each status level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub healthy: u32,
    pub degraded: u32,
    pub unhealthy: u32,
}

impl HealthSummary {
    /// Counts statuses of the given records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ComponentHealth>) -> Self {
        let mut summary = Self::default();
        for record in records {
            match record.status {
                HealthStatus::Healthy => summary.healthy += 1,
                HealthStatus::Degraded => summary.degraded += 1,
                HealthStatus::Unhealthy => summary.unhealthy += 1,
            }
        }
        summary
    }

    /// Returns the count for a single status.
    pub fn count(&self, status: HealthStatus) -> u32 {
        match status {
            HealthStatus::Healthy => self.healthy,
            HealthStatus::Degraded => self.degraded,
            HealthStatus::Unhealthy => self.unhealthy,
        }
    }

    pub fn total(&self) -> u32 {
        self.healthy + self.degraded + self.unhealthy
    }
}

/// System-wide view of the registry at one point in time.
///
/// A pure projection of the registry; it has no lifecycle of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSnapshot {
    /// Overall status derived by the aggregator.
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub components: HashMap<String, ComponentHealth>,
    pub summary: HealthSummary,
}

impl AggregateSnapshot {
    /// Snapshot of an empty registry.
    pub fn empty() -> Self {
        Self {
            status: HealthStatus::Healthy,
            timestamp: Utc::now(),
            components: HashMap::new(),
            summary: HealthSummary::default(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// Returns the ids of components at the given status, sorted.
    pub fn components_with_status(&self, status: HealthStatus) -> Vec<String> {
        let mut ids: Vec<String> = self
            .components
            .values()
            .filter(|c| c.status == status)
            .map(|c| c.component_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

// =============================================================================
// Check Report
// =============================================================================

/// Result reported by a successful health check callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl CheckReport {
    pub fn new(status: HealthStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            metadata: None,
        }
    }

    pub fn healthy() -> Self {
        Self::new(HealthStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Unhealthy, Some(message.into()))
    }

    /// Attaches metadata to the report.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
