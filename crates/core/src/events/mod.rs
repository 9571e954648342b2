//! Event bus integration.
//!
//! Provides the topic-based bus seam the health engine publishes to and
//! subscribes on, the topic names and payloads it exchanges, and an
//! in-process bus implementation. Hosts with their own bus implement
//! [`EventBus`] to bridge it.

mod bus;
mod health_event;

pub use bus::*;
pub use health_event::*;
