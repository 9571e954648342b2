//! Health monitor implementation.
//!
//! The HealthMonitor owns the component registry, runs scheduled checks and
//! the staleness sweep, aggregates component statuses and publishes every
//! recomputation to the health stream and the event bus.
//!
//! # Concurrency
//!
//! All registry mutation happens under one async mutex. Snapshots are taken
//! and emitted while that lock is held, so observers see recomputations in
//! mutation order and never a partially applied update. Check callbacks run
//! outside the lock; their results are applied only if the entry they were
//! started for still exists (see `ComponentRegistry::is_current`).

use futures::future::join_all;
use futures::stream::{BoxStream, StreamExt};
use log::{debug, error, info, warn};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::config::HealthMonitorConfig;
use super::model::{AggregateSnapshot, CheckReport, ComponentHealth, HealthStatus, Metadata};
use super::registry::{ComponentRegistry, ScheduledCheck};
use super::scheduler::{run_check, spawn_periodic};
use super::staleness::find_stale;
use super::stream::{HealthStream, HealthSubscription};
use super::traits::CheckRef;
use crate::errors::Result;
use crate::events::{
    BusEvent, ComponentChangedPayload, ComponentRecoveredPayload, ErrorOccurredPayload,
    EventBus, OverallUpdatedPayload, COMPONENT_RECOVERED, ERROR_OCCURRED,
    HEALTH_COMPONENT_CHANGED, HEALTH_OVERALL_UPDATED,
};

/// State guarded by the monitor lock.
struct MonitorState {
    registry: ComponentRegistry,
    /// Effective configuration (construction config plus `initialize` overrides).
    config: HealthMonitorConfig,
    active: bool,
    /// Staleness sweep, aggregate tick and bus listeners.
    global_tasks: Vec<JoinHandle<()>>,
}

struct MonitorInner {
    bus: Arc<dyn EventBus>,
    base_config: HealthMonitorConfig,
    state: Mutex<MonitorState>,
    stream: HealthStream,
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        for task in self.state.get_mut().global_tasks.drain(..) {
            task.abort();
        }
    }
}

/// Process-wide health engine.
///
/// Cheap to clone; all clones share one registry. Construct one per process
/// and pass it to the collaborators that report health.
///
/// # Lifecycle
///
/// ```text
/// new() ──► initialize() ──► ... ──► dispose() ──► initialize() ...
///  inactive     active                 inactive
/// ```
///
/// Registry operations work in either state. `initialize` starts the
/// staleness sweep, the aggregate tick and the event bus subscriptions;
/// `dispose` stops every timer, clears the registry and closes the stream.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<MonitorInner>,
}

impl HealthMonitor {
    /// Creates an inactive monitor with the default configuration.
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self::build(bus, HealthMonitorConfig::default())
    }

    /// Creates an inactive monitor with a custom configuration.
    pub fn with_config(bus: Arc<dyn EventBus>, config: HealthMonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(bus, config))
    }

    fn build(bus: Arc<dyn EventBus>, config: HealthMonitorConfig) -> Self {
        let stream = HealthStream::new(config.stream_capacity);
        Self {
            inner: Arc::new(MonitorInner {
                bus,
                base_config: config.clone(),
                state: Mutex::new(MonitorState {
                    registry: ComponentRegistry::new(),
                    config,
                    active: false,
                    global_tasks: Vec::new(),
                }),
                stream,
            }),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Activates the monitor.
    ///
    /// Overrides that fail validation are ignored with an error log. Calling
    /// this on an active monitor logs a warning and does nothing.
    pub async fn initialize(
        &self,
        check_interval: Option<Duration>,
        component_timeout: Option<Duration>,
    ) {
        let mut state = self.inner.state.lock().await;
        if state.active {
            warn!("Health monitor already initialized");
            return;
        }

        state.config = self.inner.resolve_config(check_interval, component_timeout);
        state.active = true;
        self.inner.stream.reopen();

        let weak = Arc::downgrade(&self.inner);
        let mut tasks = vec![
            spawn_periodic(
                "staleness".to_string(),
                weak.clone(),
                state.config.staleness_sweep_interval(),
                |inner: Arc<MonitorInner>| async move { inner.sweep_stale().await },
            ),
            spawn_periodic(
                "aggregate".to_string(),
                weak.clone(),
                state.config.aggregate_interval(),
                |inner: Arc<MonitorInner>| async move { inner.emit_current().await },
            ),
        ];
        tasks.push(spawn_listener(
            weak.clone(),
            self.inner.bus.subscribe(ERROR_OCCURRED),
            |inner, event| async move { inner.on_error_occurred(event).await },
        ));
        tasks.push(spawn_listener(
            weak,
            self.inner.bus.subscribe(COMPONENT_RECOVERED),
            |inner, event| async move { inner.on_component_recovered(event).await },
        ));
        state.global_tasks = tasks;

        info!(
            "Health monitor initialized (check interval: {:?}, timeout: {:?}, staleness threshold: {:?})",
            state.config.check_interval(),
            state.config.component_timeout(),
            state.config.staleness_threshold()
        );
    }

    /// Deactivates the monitor.
    ///
    /// Cancels every timer, clears the registry and closes the health stream.
    /// Safe to call repeatedly.
    pub async fn dispose(&self) {
        let mut state = self.inner.state.lock().await;
        for task in state.global_tasks.drain(..) {
            task.abort();
        }
        let dropped = state.registry.len();
        state.registry.clear();
        state.active = false;

        self.inner.stream.set_latest(state.registry.snapshot());
        self.inner.stream.close();

        if dropped > 0 {
            info!("Health monitor disposed ({} component(s) dropped)", dropped);
        } else {
            debug!("Health monitor disposed");
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.state.lock().await.active
    }

    /// Effective configuration.
    pub async fn config(&self) -> HealthMonitorConfig {
        self.inner.state.lock().await.config.clone()
    }

    // =========================================================================
    // Registry operations
    // =========================================================================

    /// Registers a component with an initial `healthy` record.
    ///
    /// With a check, the check runs every `check_interval` (default: the
    /// global check interval). Registering an id twice logs a warning and
    /// keeps the existing entry. Returns `true` if a new entry was created.
    pub async fn register_component(
        &self,
        component_id: impl Into<String>,
        check_interval: Option<Duration>,
        check: Option<CheckRef>,
    ) -> bool {
        let component_id = component_id.into();
        let mut state = self.inner.state.lock().await;

        let Some(generation) = state.registry.register(&component_id) else {
            warn!("Component '{}' is already registered", component_id);
            return false;
        };

        if let Some(check) = check {
            let period = match check_interval {
                Some(interval) if interval.is_zero() => {
                    warn!(
                        "Ignoring zero check interval for '{}', using the global interval",
                        component_id
                    );
                    state.config.check_interval()
                }
                Some(interval) => interval,
                None => state.config.check_interval(),
            };
            let handle = self.spawn_check_loop(&component_id, generation, period, check.clone());
            state
                .registry
                .schedule(&component_id, ScheduledCheck::new(check, handle));
            debug!(
                "Registered component '{}' with a check every {:?}",
                component_id, period
            );
        } else {
            debug!("Registered passive component '{}'", component_id);
        }

        self.inner.emit_locked(&state);
        true
    }

    /// Removes a component and cancels its check timer. No-op if absent.
    ///
    /// A check already in flight may finish; its result is discarded.
    pub async fn unregister_component(&self, component_id: &str) {
        let mut state = self.inner.state.lock().await;
        if state.registry.unregister(component_id).is_none() {
            debug!("Unregister ignored: '{}' is not registered", component_id);
            return;
        }
        debug!("Unregistered component '{}'", component_id);
        self.inner.emit_locked(&state);
    }

    /// Replaces the record for `component_id` with a freshly timestamped one.
    ///
    /// Unknown ids are created. A status change publishes
    /// `health.component.changed`; the stream is pushed either way.
    pub async fn update_component_health(
        &self,
        component_id: &str,
        status: HealthStatus,
        message: Option<String>,
        metadata: Option<Metadata>,
    ) {
        let mut state = self.inner.state.lock().await;
        self.inner
            .apply_update_locked(&mut state, component_id, status, message, metadata);
        self.inner.emit_locked(&state);
    }

    /// Past records of a component, newest first.
    ///
    /// Only the current record is retained, so this holds at most one entry.
    pub async fn get_component_history(
        &self,
        component_id: &str,
        limit: usize,
    ) -> Vec<ComponentHealth> {
        self.inner
            .state
            .lock()
            .await
            .registry
            .history(component_id, limit)
    }

    pub async fn component_health(&self, component_id: &str) -> Option<ComponentHealth> {
        self.inner
            .state
            .lock()
            .await
            .registry
            .get(component_id)
            .cloned()
    }

    /// Registered component ids, sorted.
    pub async fn component_ids(&self) -> Vec<String> {
        self.inner.state.lock().await.registry.ids()
    }

    // =========================================================================
    // Aggregate reads
    // =========================================================================

    /// Runs every component check now, waits for all, and returns the snapshot.
    pub async fn perform_full_health_check(&self) -> AggregateSnapshot {
        let (targets, timeout) = {
            let state = self.inner.state.lock().await;
            (
                state.registry.check_targets(),
                state.config.component_timeout(),
            )
        };
        info!("Running full health check on {} component(s)", targets.len());

        let inner = &self.inner;
        join_all(targets.into_iter().map(|target| async move {
            let report = run_check(&target.component_id, &target.check, timeout).await;
            inner
                .apply_check_result(&target.component_id, target.generation, report)
                .await;
        }))
        .await;

        let state = self.inner.state.lock().await;
        state.registry.snapshot()
    }

    /// Latest computed snapshot.
    pub fn current_health(&self) -> AggregateSnapshot {
        self.inner.stream.latest()
    }

    /// True iff the latest aggregate status is `healthy`.
    pub fn is_healthy(&self) -> bool {
        self.current_health().is_healthy()
    }

    /// Subscribes to live snapshots.
    ///
    /// Fails with `HealthError::StreamClosed` after `dispose` until the next
    /// `initialize`.
    pub fn subscribe(&self) -> Result<HealthSubscription> {
        Ok(self.inner.stream.subscribe()?)
    }

    /// Number of live stream observers.
    pub fn observer_count(&self) -> usize {
        self.inner.stream.observer_count()
    }

    fn spawn_check_loop(
        &self,
        component_id: &str,
        generation: u64,
        period: Duration,
        check: CheckRef,
    ) -> JoinHandle<()> {
        let id = component_id.to_string();
        spawn_periodic(
            format!("check:{component_id}"),
            Arc::downgrade(&self.inner),
            period,
            move |inner: Arc<MonitorInner>| {
                let id = id.clone();
                let check = check.clone();
                async move { inner.run_scheduled_check(&id, generation, &check).await }
            },
        )
    }
}

impl MonitorInner {
    /// Applies `initialize` overrides on top of the construction config.
    ///
    /// A zero override is rejected on its own. A timeout that is not below
    /// the effective check interval is clamped to half of it.
    fn resolve_config(
        &self,
        check_interval: Option<Duration>,
        component_timeout: Option<Duration>,
    ) -> HealthMonitorConfig {
        let base = &self.base_config;
        let interval = match check_interval {
            Some(interval) if interval.is_zero() => {
                error!("Ignoring check interval override: must be > 0");
                base.check_interval()
            }
            Some(interval) => interval,
            None => base.check_interval(),
        };
        let mut timeout = match component_timeout {
            Some(timeout) if timeout.is_zero() => {
                error!("Ignoring component timeout override: must be > 0");
                base.component_timeout()
            }
            Some(timeout) => timeout,
            None => base.component_timeout(),
        };
        if timeout >= interval {
            let clamped = interval / 2;
            warn!(
                "Component timeout {:?} is not below check interval {:?}, using {:?}",
                timeout, interval, clamped
            );
            timeout = clamped;
        }

        let config = base.with_overrides(Some(interval), Some(timeout));
        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                error!(
                    "Ignoring health monitor overrides (interval {:?}, timeout {:?}): {}",
                    check_interval, component_timeout, e
                );
                base.clone()
            }
        }
    }

    /// Writes a record and publishes a change event if the status moved.
    fn apply_update_locked(
        &self,
        state: &mut MonitorState,
        component_id: &str,
        status: HealthStatus,
        message: Option<String>,
        metadata: Option<Metadata>,
    ) {
        let record = ComponentHealth::new(component_id, status, message.clone(), metadata);
        match state.registry.upsert(record) {
            Some(previous) if previous != status => {
                info!(
                    "Component '{}' changed {} -> {}",
                    component_id, previous, status
                );
                self.publish(
                    HEALTH_COMPONENT_CHANGED,
                    &ComponentChangedPayload {
                        component_id: component_id.to_string(),
                        previous_status: previous,
                        new_status: status,
                        message,
                    },
                );
            }
            Some(_) => debug!("Component '{}' still {}", component_id, status),
            None => debug!("Created component '{}' as {}", component_id, status),
        }
    }

    /// Recomputes the aggregate and pushes it to the stream and the bus.
    fn emit_locked(&self, state: &MonitorState) {
        let snapshot = state.registry.snapshot();
        self.publish(HEALTH_OVERALL_UPDATED, &OverallUpdatedPayload::from(&snapshot));
        self.stream.push(snapshot);
    }

    async fn emit_current(&self) {
        let state = self.state.lock().await;
        self.emit_locked(&state);
    }

    fn publish<T: serde::Serialize>(&self, topic: &str, payload: &T) {
        match BusEvent::from_payload(topic, payload) {
            Ok(event) => self.bus.publish(event),
            Err(e) => error!("Failed to encode '{}' event: {}", topic, e),
        }
    }

    async fn run_scheduled_check(&self, component_id: &str, generation: u64, check: &CheckRef) {
        let timeout = self.state.lock().await.config.component_timeout();
        let report = run_check(component_id, check, timeout).await;
        self.apply_check_result(component_id, generation, report).await;
    }

    /// Applies a check result unless the entry was removed or replaced meanwhile.
    async fn apply_check_result(&self, component_id: &str, generation: u64, report: CheckReport) {
        let mut state = self.state.lock().await;
        if !state.registry.is_current(component_id, generation) {
            debug!(
                "Discarding check result for '{}': component no longer registered",
                component_id
            );
            return;
        }
        self.apply_update_locked(
            &mut state,
            component_id,
            report.status,
            report.message,
            report.metadata,
        );
        self.emit_locked(&state);
    }

    async fn sweep_stale(&self) {
        let mut state = self.state.lock().await;
        let threshold = state.config.staleness_threshold();
        let stale = find_stale(&state.registry, threshold, Instant::now());

        for component in stale {
            warn!(
                "Component '{}' silent for {:?}, marking degraded",
                component.component_id, component.elapsed
            );
            self.apply_update_locked(
                &mut state,
                &component.component_id,
                HealthStatus::Degraded,
                Some(component.message()),
                None,
            );
            self.emit_locked(&state);
        }
    }

    /// Updates a registered component from a bus event. Unknown ids are ignored.
    async fn update_if_registered(&self, component_id: &str, status: HealthStatus, message: String) {
        let mut state = self.state.lock().await;
        if !state.registry.contains(component_id) {
            debug!("Ignoring bus event for unknown component '{}'", component_id);
            return;
        }
        self.apply_update_locked(&mut state, component_id, status, Some(message), None);
        self.emit_locked(&state);
    }

    async fn on_error_occurred(&self, event: BusEvent) {
        match event.parse::<ErrorOccurredPayload>() {
            Ok(payload) => {
                let Some(id) = payload.component_id.as_deref() else {
                    debug!("Ignoring '{}' event without componentId", ERROR_OCCURRED);
                    return;
                };
                let message = format!("Error: {}", payload.error_text());
                self.update_if_registered(id, HealthStatus::Unhealthy, message)
                    .await;
            }
            Err(e) => debug!("Ignoring malformed '{}' event: {}", ERROR_OCCURRED, e),
        }
    }

    async fn on_component_recovered(&self, event: BusEvent) {
        match event.parse::<ComponentRecoveredPayload>() {
            Ok(ComponentRecoveredPayload {
                component_id: Some(id),
            }) => {
                self.update_if_registered(
                    &id,
                    HealthStatus::Healthy,
                    "Component recovered".to_string(),
                )
                .await;
            }
            Ok(_) => debug!("Ignoring '{}' event without componentId", COMPONENT_RECOVERED),
            Err(e) => debug!("Ignoring malformed '{}' event: {}", COMPONENT_RECOVERED, e),
        }
    }
}

/// Spawns a task that forwards bus events to the monitor until either goes away.
fn spawn_listener<F, Fut>(
    target: Weak<MonitorInner>,
    mut events: BoxStream<'static, BusEvent>,
    handle: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<MonitorInner>, BusEvent) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let Some(inner) = target.upgrade() else {
                return;
            };
            let fut = handle(inner, event);
            fut.await;
        }
        debug!("Event bus subscription ended");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::events::RecordingEventBus;
    use crate::health::{CheckFn, HealthSummary, DEFAULT_CHECK_INTERVAL};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn monitor_with_bus() -> (HealthMonitor, RecordingEventBus) {
        let bus = RecordingEventBus::new();
        let monitor = HealthMonitor::new(Arc::new(bus.clone()));
        (monitor, bus)
    }

    fn fast_config() -> HealthMonitorConfig {
        HealthMonitorConfig {
            check_interval_ms: 1_000,
            component_timeout_ms: 200,
            staleness_sweep_interval_ms: 500,
            staleness_multiplier: 3,
            aggregate_interval_ms: Some(60_000),
            stream_capacity: 64,
        }
    }

    fn changed_events(bus: &RecordingEventBus) -> Vec<ComponentChangedPayload> {
        bus.events_on(HEALTH_COMPONENT_CHANGED)
            .iter()
            .map(|e| e.parse().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_register_inserts_healthy_record_and_emits() {
        let (monitor, bus) = monitor_with_bus();
        let mut observer = monitor.subscribe().unwrap();

        monitor.register_component("storage", None, None).await;

        let record = monitor.component_health("storage").await.unwrap();
        assert_eq!(record.status, HealthStatus::Healthy);
        assert_eq!(record.message.as_deref(), Some("registered"));

        let snapshot = observer.recv().await.unwrap();
        assert_eq!(snapshot.summary.healthy, 1);
        assert_eq!(bus.events_on(HEALTH_OVERALL_UPDATED).len(), 1);
    }

    #[tokio::test]
    async fn test_double_registration_keeps_existing_entry() {
        let (monitor, bus) = monitor_with_bus();
        assert!(monitor.register_component("tray", None, None).await);
        monitor
            .update_component_health("tray", HealthStatus::Degraded, None, None)
            .await;

        assert!(!monitor.register_component("tray", None, None).await);

        let record = monitor.component_health("tray").await.unwrap();
        assert_eq!(record.status, HealthStatus::Degraded);
        // register + update only; the rejected registration emits nothing
        assert_eq!(bus.events_on(HEALTH_OVERALL_UPDATED).len(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_status_pushes_without_change_event() {
        let (monitor, bus) = monitor_with_bus();
        monitor.register_component("a", None, None).await;
        let mut observer = monitor.subscribe().unwrap();

        monitor
            .update_component_health("a", HealthStatus::Healthy, Some("still fine".into()), None)
            .await;

        assert!(changed_events(&bus).is_empty());
        let snapshot = observer.recv().await.unwrap();
        assert_eq!(
            snapshot.components["a"].message.as_deref(),
            Some("still fine")
        );
    }

    #[tokio::test]
    async fn test_update_unknown_component_creates_entry() {
        let (monitor, bus) = monitor_with_bus();
        monitor
            .update_component_health("late", HealthStatus::Unhealthy, None, None)
            .await;

        assert_eq!(monitor.component_ids().await, vec!["late".to_string()]);
        assert!(!monitor.is_healthy());
        assert!(changed_events(&bus).is_empty());
    }

    #[tokio::test]
    async fn test_metadata_is_passed_through() {
        let (monitor, _bus) = monitor_with_bus();
        let mut meta = Metadata::new();
        meta.insert("queueDepth".to_string(), json!(42));

        monitor
            .update_component_health("queue", HealthStatus::Healthy, None, Some(meta.clone()))
            .await;

        let record = monitor.component_health("queue").await.unwrap();
        assert_eq!(record.metadata, Some(meta));
    }

    #[tokio::test]
    async fn test_history_returns_current_record_only() {
        let (monitor, _bus) = monitor_with_bus();
        monitor.register_component("a", None, None).await;
        monitor
            .update_component_health("a", HealthStatus::Degraded, Some("x".into()), None)
            .await;

        let history = monitor.get_component_history("a", 50).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, HealthStatus::Degraded);
        assert!(monitor.get_component_history("b", 50).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_check_updates_record() {
        let bus = RecordingEventBus::new();
        let monitor = HealthMonitor::with_config(Arc::new(bus.clone()), fast_config()).unwrap();

        let check = CheckFn::arc(|| async { Ok(CheckReport::degraded("high latency")) });
        monitor
            .register_component("network", Some(Duration::from_secs(2)), Some(check))
            .await;

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(
            monitor.component_health("network").await.unwrap().status,
            HealthStatus::Healthy
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        let record = monitor.component_health("network").await.unwrap();
        assert_eq!(record.status, HealthStatus::Degraded);
        assert_eq!(record.message.as_deref(), Some("high latency"));

        let changes = changed_events(&bus);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous_status, HealthStatus::Healthy);
        assert_eq!(changes[0].new_status, HealthStatus::Degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_check_marks_unhealthy() {
        let (monitor, _bus) = monitor_with_bus();
        let check = CheckFn::arc(|| async { Err(Error::unexpected("keychain locked")) });
        monitor
            .register_component("secure_storage", Some(Duration::from_secs(1)), Some(check))
            .await;

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let record = monitor.component_health("secure_storage").await.unwrap();
        assert_eq!(record.status, HealthStatus::Unhealthy);
        assert!(record.message.unwrap().contains("keychain locked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_check_does_not_block_other_components() {
        let monitor =
            HealthMonitor::with_config(Arc::new(RecordingEventBus::new()), fast_config()).unwrap();

        let hung = CheckFn::arc(|| async {
            std::future::pending::<()>().await;
            Ok(CheckReport::healthy())
        });
        let quick = CheckFn::arc(|| async { Ok(CheckReport::degraded("warm-up")) });

        monitor.register_component("hung", None, Some(hung)).await;
        monitor.register_component("quick", None, Some(quick)).await;

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        assert_eq!(
            monitor.component_health("quick").await.unwrap().status,
            HealthStatus::Degraded
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        let hung = monitor.component_health("hung").await.unwrap();
        assert_eq!(hung.status, HealthStatus::Unhealthy);
        assert!(hung.message.unwrap().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregister_stops_checks_and_drops_late_results() {
        let (monitor, _bus) = monitor_with_bus();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let check = CheckFn::arc(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(CheckReport::unhealthy("flapping"))
            }
        });

        monitor
            .register_component("bg", Some(Duration::from_secs(1)), Some(check))
            .await;
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        monitor.unregister_component("bg").await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(monitor.component_health("bg").await.is_none());
        assert!(monitor.is_healthy());
    }

    #[tokio::test]
    async fn test_check_result_for_replaced_entry_is_discarded() {
        let (monitor, _bus) = monitor_with_bus();
        monitor.register_component("x", None, None).await;
        let old_generation = {
            let state = monitor.inner.state.lock().await;
            let x = state.registry.iter().next().unwrap().generation; x
        };

        monitor.unregister_component("x").await;
        monitor
            .inner
            .apply_check_result("x", old_generation, CheckReport::unhealthy("late"))
            .await;
        assert!(monitor.component_health("x").await.is_none());

        monitor.register_component("x", None, None).await;
        monitor
            .inner
            .apply_check_result("x", old_generation, CheckReport::unhealthy("late"))
            .await;
        assert_eq!(
            monitor.component_health("x").await.unwrap().status,
            HealthStatus::Healthy
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness_sweep_downgrades_silent_component() {
        let (monitor, bus) = monitor_with_bus();
        monitor
            .initialize(Some(Duration::from_secs(1)), Some(Duration::from_millis(100)))
            .await;
        monitor.register_component("passive", None, None).await;
        monitor
            .update_component_health("failing", HealthStatus::Unhealthy, None, None)
            .await;

        // threshold 3s; the default sweep runs every 10s
        tokio::time::sleep(Duration::from_millis(10_100)).await;

        let record = monitor.component_health("passive").await.unwrap();
        assert_eq!(record.status, HealthStatus::Degraded);
        assert!(record.message.unwrap().starts_with("No health update for"));
        assert_eq!(
            monitor.component_health("failing").await.unwrap().status,
            HealthStatus::Unhealthy
        );
        assert!(changed_events(&bus)
            .iter()
            .any(|c| c.component_id == "passive" && c.new_status == HealthStatus::Degraded));

        monitor.dispose().await;
    }

    #[tokio::test]
    async fn test_full_health_check_runs_every_check() {
        let (monitor, _bus) = monitor_with_bus();
        let ok = CheckFn::arc(|| async { Ok(CheckReport::healthy()) });
        let bad = CheckFn::arc(|| async { Ok(CheckReport::unhealthy("no permission")) });

        monitor
            .register_component("notifications", Some(Duration::from_secs(3600)), Some(bad))
            .await;
        monitor
            .register_component("tray", Some(Duration::from_secs(3600)), Some(ok))
            .await;
        monitor.register_component("passive", None, None).await;

        let snapshot = monitor.perform_full_health_check().await;
        assert_eq!(snapshot.status, HealthStatus::Unhealthy);
        assert_eq!(
            snapshot.summary,
            HealthSummary {
                healthy: 2,
                degraded: 0,
                unhealthy: 1
            }
        );
        assert_eq!(
            snapshot.components["notifications"].message.as_deref(),
            Some("no permission")
        );
    }

    #[tokio::test]
    async fn test_bus_events_update_registered_components() {
        let (monitor, bus) = monitor_with_bus();
        monitor.initialize(None, None).await;
        monitor.register_component("sync", None, None).await;
        let mut observer = monitor.subscribe().unwrap();

        bus.publish(BusEvent::new(
            ERROR_OCCURRED,
            json!({"componentId": "sync", "error": "socket closed"}),
        ));
        let snapshot = observer.recv().await.unwrap();
        assert_eq!(
            snapshot.components["sync"].message.as_deref(),
            Some("Error: socket closed")
        );
        assert_eq!(snapshot.status, HealthStatus::Unhealthy);

        bus.publish(BusEvent::new(
            COMPONENT_RECOVERED,
            json!({"componentId": "sync"}),
        ));
        let snapshot = observer.recv().await.unwrap();
        assert_eq!(snapshot.status, HealthStatus::Healthy);
        assert_eq!(
            snapshot.components["sync"].message.as_deref(),
            Some("Component recovered")
        );

        monitor.dispose().await;
    }

    #[tokio::test]
    async fn test_bus_events_for_unknown_components_are_ignored() {
        let (monitor, bus) = monitor_with_bus();
        monitor.initialize(None, None).await;
        monitor.register_component("known", None, None).await;

        bus.publish(BusEvent::new(ERROR_OCCURRED, json!({"componentId": "ghost", "error": "x"})));
        bus.publish(BusEvent::new(ERROR_OCCURRED, json!({"error": "no id"})));
        bus.publish(BusEvent::new(COMPONENT_RECOVERED, json!("garbage")));
        // Delivery is ordered, so once this lands the others were handled.
        bus.publish(BusEvent::new(ERROR_OCCURRED, json!({"componentId": "known", "error": "y"})));

        for _ in 0..100 {
            if !monitor.is_healthy() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(monitor.component_ids().await, vec!["known".to_string()]);
        assert!(!monitor.is_healthy());

        monitor.dispose().await;
    }

    #[tokio::test]
    async fn test_initialize_twice_is_noop() {
        let (monitor, _bus) = monitor_with_bus();
        monitor
            .initialize(Some(Duration::from_secs(20)), None)
            .await;
        monitor
            .initialize(Some(Duration::from_secs(60)), None)
            .await;

        assert!(monitor.is_initialized().await);
        assert_eq!(
            monitor.config().await.check_interval(),
            Duration::from_secs(20)
        );
        monitor.dispose().await;
    }

    #[tokio::test]
    async fn test_zero_overrides_fall_back_to_base_config() {
        let (monitor, _bus) = monitor_with_bus();
        monitor
            .initialize(Some(Duration::ZERO), Some(Duration::ZERO))
            .await;
        assert_eq!(monitor.config().await, HealthMonitorConfig::default());
        monitor.dispose().await;
    }

    #[tokio::test]
    async fn test_short_interval_override_clamps_default_timeout() {
        let (monitor, _bus) = monitor_with_bus();
        monitor.initialize(Some(Duration::from_secs(3)), None).await;

        let config = monitor.config().await;
        assert_eq!(config.check_interval(), Duration::from_secs(3));
        assert_eq!(config.component_timeout(), Duration::from_millis(1500));
        monitor.dispose().await;
    }

    #[tokio::test]
    async fn test_timeout_override_above_interval_is_clamped() {
        let (monitor, _bus) = monitor_with_bus();
        monitor
            .initialize(Some(Duration::from_secs(1)), Some(Duration::from_secs(10)))
            .await;

        let config = monitor.config().await;
        assert_eq!(config.check_interval(), Duration::from_secs(1));
        assert_eq!(config.component_timeout(), Duration::from_millis(500));
        monitor.dispose().await;
    }

    #[tokio::test]
    async fn test_zero_interval_override_keeps_valid_timeout_override() {
        let (monitor, _bus) = monitor_with_bus();
        monitor
            .initialize(Some(Duration::ZERO), Some(Duration::from_secs(2)))
            .await;

        let config = monitor.config().await;
        assert_eq!(config.check_interval(), DEFAULT_CHECK_INTERVAL);
        assert_eq!(config.component_timeout(), Duration::from_secs(2));
        monitor.dispose().await;
    }

    #[tokio::test]
    async fn test_dispose_clears_state_and_closes_stream() {
        let (monitor, _bus) = monitor_with_bus();
        monitor.initialize(None, None).await;
        monitor.register_component("a", None, None).await;
        monitor
            .update_component_health("a", HealthStatus::Unhealthy, None, None)
            .await;
        let mut observer = monitor.subscribe().unwrap();

        monitor.dispose().await;
        monitor.dispose().await;

        assert!(!monitor.is_initialized().await);
        assert!(monitor.component_ids().await.is_empty());
        assert!(monitor.is_healthy());
        assert!(observer.recv().await.is_none());
        assert!(monitor.subscribe().is_err());

        monitor.initialize(None, None).await;
        assert!(monitor.subscribe().is_ok());
        monitor.dispose().await;
    }

    #[test]
    fn test_with_config_validates() {
        let config = HealthMonitorConfig {
            check_interval_ms: 0,
            ..Default::default()
        };
        assert!(HealthMonitor::with_config(Arc::new(RecordingEventBus::new()), config).is_err());
    }
}
