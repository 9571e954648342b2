//! Health check contract.
//!
//! A component either reports passively through
//! `HealthMonitor::update_component_health` or supplies a [`HealthCheck`]
//! that the scheduler invokes on a fixed interval.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use super::model::CheckReport;
use crate::errors::Result;

/// Shared handle to a health check.
pub type CheckRef = Arc<dyn HealthCheck>;

/// Asynchronous health probe for one component.
///
/// # Implementation Notes
///
/// - The call may suspend (perform I/O); it is bounded by the component timeout
/// - Returning `Err` marks the component `unhealthy` with the error text
/// - The future may be dropped mid-flight on timeout or unregistration
///
/// # Example
///
/// ```ignore
/// struct StorageCheck {
///     store: Arc<dyn SecureStore>,
/// }
///
/// #[async_trait]
/// impl HealthCheck for StorageCheck {
///     async fn check(&self) -> Result<CheckReport> {
///         self.store.ping().await?;
///         Ok(CheckReport::healthy())
///     }
/// }
/// ```
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Produces the component's current status, or fails.
    async fn check(&self) -> Result<CheckReport>;
}

/// Closure-backed health check.
///
/// Wraps a closure that creates a fresh future per invocation.
pub struct CheckFn<F> {
    f: F,
}

impl<F> CheckFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the check and returns it as a shared handle.
    ///
    /// ```ignore
    /// let check: CheckRef = CheckFn::arc(|| async { Ok(CheckReport::healthy()) });
    /// ```
    pub fn arc<Fut>(f: F) -> CheckRef
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CheckReport>> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> HealthCheck for CheckFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CheckReport>> + Send + 'static,
{
    async fn check(&self) -> Result<CheckReport> {
        (self.f)().await
    }
}
