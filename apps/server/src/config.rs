use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use mcp_health_core::HealthMonitorConfig;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// Passed to `initialize`; `None` keeps the engine default.
    pub check_interval: Option<Duration>,
    pub component_timeout: Option<Duration>,
    pub staleness_sweep_interval: Option<Duration>,
    pub event_bus_capacity: usize,
}

impl Config {
    /// Reads the process environment; `main` loads `.env` into it first.
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr: SocketAddr = std::env::var("MCP_HEALTH_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8090".to_string())
            .parse()
            .context("Invalid MCP_HEALTH_LISTEN_ADDR")?;
        let cors_allow = std::env::var("MCP_HEALTH_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms = env_u64("MCP_HEALTH_REQUEST_TIMEOUT_MS").unwrap_or(30000);
        let event_bus_capacity =
            env_u64("MCP_HEALTH_EVENT_BUS_CAPACITY").map_or(256, |v| v as usize);

        Ok(Self {
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            check_interval: env_u64("MCP_HEALTH_CHECK_INTERVAL_SECS").map(Duration::from_secs),
            component_timeout: env_u64("MCP_HEALTH_COMPONENT_TIMEOUT_MS")
                .map(Duration::from_millis),
            staleness_sweep_interval: env_u64("MCP_HEALTH_STALENESS_SWEEP_SECS")
                .map(Duration::from_secs),
            event_bus_capacity,
        })
    }

    /// Construction-time engine config; interval and timeout go through `initialize`.
    pub fn monitor_config(&self) -> HealthMonitorConfig {
        let mut config = HealthMonitorConfig::default();
        if let Some(sweep) = self.staleness_sweep_interval {
            config.staleness_sweep_interval_ms = sweep.as_millis() as u64;
        }
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            check_interval: None,
            component_timeout: None,
            staleness_sweep_interval: None,
            event_bus_capacity: 256,
        }
    }
}

/// Reads a numeric variable; unset yields `None`, garbage is logged and ignored.
fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}: '{}' is not a number", key, raw);
            None
        }
    }
}
