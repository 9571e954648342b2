//! Health monitor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::HealthError;

/// Default period between scheduled checks of a component.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Default upper bound on a single check callback.
pub const DEFAULT_COMPONENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default period of the staleness sweep.
pub const DEFAULT_STALENESS_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for the health monitor timers and stream.
///
/// Durations are stored in milliseconds so the config round-trips through
/// JSON and environment variables unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthMonitorConfig {
    /// Global check period, used when a registration gives no interval (default: 30s)
    pub check_interval_ms: u64,

    /// Timeout applied to every check callback (default: 5s)
    pub component_timeout_ms: u64,

    /// Period of the staleness sweep (default: 10s)
    pub staleness_sweep_interval_ms: u64,

    /// A component is stale after `staleness_multiplier × check_interval` of silence (default: 3)
    pub staleness_multiplier: u32,

    /// Period of the independent aggregate re-emission (default: the check interval)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_interval_ms: Option<u64>,

    /// Snapshots buffered per observer before a slow observer starts lagging (default: 64)
    pub stream_capacity: usize,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: DEFAULT_CHECK_INTERVAL.as_millis() as u64,
            component_timeout_ms: DEFAULT_COMPONENT_TIMEOUT.as_millis() as u64,
            staleness_sweep_interval_ms: DEFAULT_STALENESS_SWEEP_INTERVAL.as_millis() as u64,
            staleness_multiplier: 3,
            aggregate_interval_ms: None,
            stream_capacity: 64,
        }
    }
}

impl HealthMonitorConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn component_timeout(&self) -> Duration {
        Duration::from_millis(self.component_timeout_ms)
    }

    pub fn staleness_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.staleness_sweep_interval_ms)
    }

    /// Silence after which a component is considered stale.
    pub fn staleness_threshold(&self) -> Duration {
        self.check_interval() * self.staleness_multiplier
    }

    pub fn aggregate_interval(&self) -> Duration {
        self.aggregate_interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.check_interval())
    }

    /// Returns a copy with the `initialize` overrides applied.
    pub fn with_overrides(
        &self,
        check_interval: Option<Duration>,
        component_timeout: Option<Duration>,
    ) -> Self {
        let mut config = self.clone();
        if let Some(interval) = check_interval {
            config.check_interval_ms = interval.as_millis() as u64;
        }
        if let Some(timeout) = component_timeout {
            config.component_timeout_ms = timeout.as_millis() as u64;
        }
        config
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), HealthError> {
        if self.check_interval_ms == 0 {
            return Err(HealthError::InvalidConfig(
                "check_interval_ms must be > 0".to_string(),
            ));
        }
        if self.component_timeout_ms == 0 {
            return Err(HealthError::InvalidConfig(
                "component_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.component_timeout_ms >= self.check_interval_ms {
            return Err(HealthError::InvalidConfig(
                "component_timeout_ms must be < check_interval_ms".to_string(),
            ));
        }
        if self.staleness_sweep_interval_ms == 0 {
            return Err(HealthError::InvalidConfig(
                "staleness_sweep_interval_ms must be > 0".to_string(),
            ));
        }
        if self.staleness_multiplier == 0 {
            return Err(HealthError::InvalidConfig(
                "staleness_multiplier must be > 0".to_string(),
            ));
        }
        if self.aggregate_interval_ms == Some(0) {
            return Err(HealthError::InvalidConfig(
                "aggregate_interval_ms must be > 0".to_string(),
            ));
        }
        if self.stream_capacity == 0 {
            return Err(HealthError::InvalidConfig(
                "stream_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
