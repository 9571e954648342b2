//! Check scheduling.
//!
//! Every timer in the engine (per-component checks, the staleness sweep and
//! the aggregate tick) is an independent task built by [`spawn_periodic`].
//! Tasks hold only a weak reference to their target, so a dropped monitor
//! stops its timers at the next tick.

use log::{debug, warn};
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::errors::HealthError;
use super::model::CheckReport;
use super::traits::CheckRef;

/// Spawns a task that calls `tick` every `period`, starting one period from now.
///
/// The task exits once `target` has been dropped. Ticks missed while `tick`
/// runs are delayed, never bunched.
pub(crate) fn spawn_periodic<T, F, Fut>(
    name: String,
    target: Weak<T>,
    period: Duration,
    tick: F,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            let Some(target) = target.upgrade() else {
                debug!("Timer '{}' stopped: owner dropped", name);
                return;
            };
            let fut = tick(target);
            fut.await;
        }
    })
}

/// Runs one check bounded by `timeout`.
///
/// Failures and timeouts become an `unhealthy` report; nothing propagates.
/// On timeout the check future is dropped, so its late result can never be
/// observed.
pub(crate) async fn run_check(
    component_id: &str,
    check: &CheckRef,
    timeout: Duration,
) -> CheckReport {
    match tokio::time::timeout(timeout, check.check()).await {
        Ok(Ok(report)) => {
            debug!("Health check for '{}' reported {}", component_id, report.status);
            report
        }
        Ok(Err(e)) => {
            let err = HealthError::check_failed(component_id, e.to_string());
            warn!("{}", err);
            CheckReport::unhealthy(err.to_string())
        }
        Err(_) => {
            let err = HealthError::timed_out(component_id, timeout);
            warn!("{}", err);
            CheckReport::unhealthy(err.to_string())
        }
    }
}
