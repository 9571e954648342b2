//! MCP Health Core - Component health monitoring engine.
//!
//! This crate tracks the health of independently reporting components,
//! aggregates them into a system status and publishes every change to an
//! event bus and a live health stream. It is transport-agnostic; the server
//! crate exposes it over HTTP.

pub mod errors;
pub mod events;
pub mod health;

// Re-export the engine surface
pub use health::{
    AggregateSnapshot, CheckFn, CheckReport, CheckRef, ComponentHealth, HealthCheck, HealthError,
    HealthMonitor, HealthMonitorConfig, HealthStatus, HealthSubscription, HealthSummary,
};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
