use std::sync::Arc;

use async_trait::async_trait;
use mcp_health_core::{
    events::{EventBus, InMemoryEventBus},
    health::Metadata,
    CheckReport, HealthCheck, HealthMonitor,
};
use serde_json::json;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

/// Id of the component the server registers for its own event bus.
pub const EVENT_BUS_COMPONENT_ID: &str = "event_bus";

pub struct AppState {
    pub monitor: HealthMonitor,
    pub event_bus: Arc<InMemoryEventBus>,
}

pub fn init_tracing() {
    let log_format = std::env::var("MCP_HEALTH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let event_bus = Arc::new(InMemoryEventBus::new(config.event_bus_capacity));
    let monitor = HealthMonitor::with_config(event_bus.clone(), config.monitor_config())?;

    monitor
        .initialize(config.check_interval, config.component_timeout)
        .await;
    monitor
        .register_component(
            EVENT_BUS_COMPONENT_ID,
            None,
            Some(Arc::new(EventBusCheck {
                bus: event_bus.clone(),
            })),
        )
        .await;
    tracing::info!(
        "Health monitor ready with {:?}",
        monitor.config().await
    );

    Ok(Arc::new(AppState { monitor, event_bus }))
}

/// Disposes the monitor; called once the server stops accepting requests.
pub async fn shutdown(state: &AppState) {
    tracing::info!("Shutting down health monitor");
    state.monitor.dispose().await;
}

/// Verifies the in-process bus still hands out subscriptions.
struct EventBusCheck {
    bus: Arc<InMemoryEventBus>,
}

#[async_trait]
impl HealthCheck for EventBusCheck {
    async fn check(&self) -> mcp_health_core::Result<CheckReport> {
        let before = self.bus.subscriber_count();
        let probe = self.bus.subscribe(EVENT_BUS_COMPONENT_ID);
        let accepted = self.bus.subscriber_count() > before;
        drop(probe);

        let mut metadata = Metadata::new();
        metadata.insert("subscribers".to_string(), json!(before));
        let report = if accepted {
            CheckReport::healthy()
        } else {
            CheckReport::unhealthy("Event bus rejected a subscription")
        };
        Ok(report.with_metadata(metadata))
    }
}
