//! Health monitor module.
//!
//! Tracks the operational status of independently reporting components and
//! derives a single system status from them.
//!
//! # Architecture
//!
//! ```text
//! HealthMonitor → [Component Registry] ← scheduled checks / staleness sweep
//!      ↓                                 ← update_component_health / event bus
//! Aggregator → AggregateSnapshot
//!      ↓
//! Health Stream (observers) + Event Bus (health.overall.updated)
//! ```
//!
//! - **Models** (`model.rs`) - Domain types: HealthStatus, ComponentHealth, AggregateSnapshot
//! - **Config** (`config.rs`) - Intervals, timeout and staleness threshold
//! - **Traits** (`traits.rs`) - The check callback contract
//! - **Errors** (`errors.rs`) - Health-specific error types
//! - **Monitor** (`monitor.rs`) - Orchestrates registry, timers and emission
//!
//! # Status Levels
//!
//! - **Healthy** - Operating normally
//! - **Degraded** - Working with reduced capability, or silent for too long
//! - **Unhealthy** - Failing, or its check errored or timed out
//!
//! # Aggregation
//!
//! Any unhealthy component makes the system unhealthy. Otherwise any degraded
//! component makes it degraded. An empty registry is healthy.

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod model;
pub mod monitor;
pub mod traits;

mod registry;
mod scheduler;
mod staleness;
mod stream;

// Re-export commonly used types
pub use aggregator::aggregate_status;
pub use config::{
    HealthMonitorConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_COMPONENT_TIMEOUT,
    DEFAULT_STALENESS_SWEEP_INTERVAL,
};
pub use errors::HealthError;
pub use model::{
    AggregateSnapshot, CheckReport, ComponentHealth, HealthStatus, HealthSummary, Metadata,
};
pub use monitor::HealthMonitor;
pub use stream::HealthSubscription;
pub use traits::{CheckFn, CheckRef, HealthCheck};
