//! Status aggregation.
//!
//! Derives one system-wide status from the set of component records. The
//! policy is pessimistic and unweighted:
//!
//! ```text
//! no components            -> healthy
//! any component unhealthy  -> unhealthy
//! any component degraded   -> degraded   (regardless of the degraded fraction)
//! otherwise                -> healthy
//! ```

use chrono::Utc;
use std::collections::HashMap;

use super::model::{AggregateSnapshot, ComponentHealth, HealthStatus, HealthSummary};

/// Computes the overall status from component statuses.
pub fn aggregate_status<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = HealthStatus>,
{
    let mut degraded = 0usize;
    for status in statuses {
        match status {
            HealthStatus::Unhealthy => return HealthStatus::Unhealthy,
            HealthStatus::Degraded => degraded += 1,
            HealthStatus::Healthy => {}
        }
    }

    if degraded > 0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Builds a snapshot of the given records stamped with the current time.
pub fn snapshot<'a, I>(records: I) -> AggregateSnapshot
where
    I: IntoIterator<Item = &'a ComponentHealth>,
{
    let components: HashMap<String, ComponentHealth> = records
        .into_iter()
        .map(|r| (r.component_id.clone(), r.clone()))
        .collect();
    let summary = HealthSummary::from_records(components.values());
    let status = aggregate_status(components.values().map(|c| c.status));

    AggregateSnapshot {
        status,
        timestamp: Utc::now(),
        components,
        summary,
    }
}
