use std::{convert::Infallible, sync::Arc, time::Duration};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use mcp_health_core::health::{
    AggregateSnapshot, ComponentHealth, HealthError, HealthStatus, Metadata,
};
use serde::Deserialize;

/// History entries returned when the caller does not pass `limit`.
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Get the latest aggregate snapshot.
async fn get_health(State(state): State<Arc<AppState>>) -> Json<AggregateSnapshot> {
    Json(state.monitor.current_health())
}

/// Run every component check now and return the fresh snapshot.
async fn run_health_checks(State(state): State<Arc<AppState>>) -> Json<AggregateSnapshot> {
    Json(state.monitor.perform_full_health_check().await)
}

async fn get_component(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ComponentHealth>> {
    let record = state
        .monitor
        .component_health(&id)
        .await
        .ok_or_else(|| HealthError::UnknownComponent(id.clone()))?;
    Ok(Json(record))
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn get_component_history(
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<ComponentHealth>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(state.monitor.get_component_history(&id, limit).await)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateComponentRequest {
    status: HealthStatus,
    message: Option<String>,
    metadata: Option<Metadata>,
}

/// Report a component status. Unknown components are created.
async fn update_component(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateComponentRequest>,
) -> ApiResult<Json<ComponentHealth>> {
    state
        .monitor
        .update_component_health(&id, body.status, body.message, body.metadata)
        .await;
    get_component(Path(id), State(state)).await
}

/// Register a passive component. Registering an existing id changes nothing.
async fn register_component(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    if state.monitor.register_component(id, None, None).await {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

async fn unregister_component(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    state.monitor.unregister_component(&id).await;
    StatusCode::NO_CONTENT
}

/// Live snapshots as server-sent `health` events.
async fn stream_health(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let snapshots = state.monitor.subscribe()?.into_stream();
    let stream = snapshots.filter_map(|snapshot| async move {
        match SseEvent::default().event("health").json_data(&snapshot) {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                tracing::error!("Failed to serialize health snapshot: {}", err);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

/// Liveness: 200 while the monitor is running.
pub async fn healthz(State(state): State<Arc<AppState>>) -> ApiResult<&'static str> {
    if state.monitor.is_initialized().await {
        Ok("ok")
    } else {
        Err(ApiError::Unavailable(
            "Health monitor is not running".to_string(),
        ))
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(get_health))
        .route("/health/check", post(run_health_checks))
        .route("/health/stream", get(stream_health))
        .route(
            "/health/components/{id}",
            get(get_component)
                .put(update_component)
                .post(register_component)
                .delete(unregister_component),
        )
        .route(
            "/health/components/{id}/history",
            get(get_component_history),
        )
}
