//! Staleness detection.
//!
//! A component that has not had a status assigned for longer than the
//! staleness threshold is downgraded to `degraded`, unless it is already
//! `unhealthy`. This catches hung check callbacks and owners that stopped
//! reporting.

use std::time::Duration;
use tokio::time::Instant;

use super::model::HealthStatus;
use super::registry::ComponentRegistry;

/// A component that exceeded the staleness threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StaleComponent {
    pub component_id: String,
    pub elapsed: Duration,
}

impl StaleComponent {
    /// Message recorded on the downgraded record.
    pub fn message(&self) -> String {
        format!("No health update for {} seconds", self.elapsed.as_secs())
    }
}

/// Finds components silent for longer than `threshold` as of `now`.
///
/// Results are sorted by id so downgrades are applied in a stable order.
pub(crate) fn find_stale(
    registry: &ComponentRegistry,
    threshold: Duration,
    now: Instant,
) -> Vec<StaleComponent> {
    let mut stale: Vec<StaleComponent> = registry
        .iter()
        .filter(|entry| entry.health.status != HealthStatus::Unhealthy)
        .filter_map(|entry| {
            let elapsed = now.saturating_duration_since(entry.updated_at);
            (elapsed > threshold).then(|| StaleComponent {
                component_id: entry.health.component_id.clone(),
                elapsed,
            })
        })
        .collect();
    stale.sort_by(|a, b| a.component_id.cmp(&b.component_id));
    stale
}
