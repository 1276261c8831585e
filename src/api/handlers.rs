//! HTTP endpoint handlers
//!
//! Each handler turns a request into one timer intent and answers with the
//! collections as they stand afterwards.

use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use tracing::{error, info};

use crate::{
    state::{AppState, CompleteOutcome, TimerId, TimerStatus},
    tasks::TimerHandle,
};
use super::responses::{
    AddTimerRequest, ApiError, ApiResponse, HealthResponse, SetStatusRequest, StatusResponse,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn respond(timers: &TimerHandle, message: String) -> ApiResult<ApiResponse> {
    let snapshot = timers.snapshot().await.map_err(|e| {
        error!("Failed to read timers: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(ApiResponse::ok(message, snapshot)))
}

fn unknown_timer(id: TimerId) -> ApiError {
    ApiError::not_found(format!("No active timer with id {}", id))
}

/// Handle GET /timers - Active and completed timers
pub async fn list_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    respond(&state.timers, "Current timers".to_string()).await
}

/// Handle GET /completed - Completed timers only
pub async fn completed_handler(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    let mut response = respond(&state.timers, "Completed timers".to_string()).await?;
    response.0.timers.timers.clear();
    Ok(response)
}

/// Handle POST /timers - Add a paused timer
pub async fn add_handler(
    State(state): State<Arc<AppState>>,
    request: Result<Json<AddTimerRequest>, JsonRejection>,
) -> ApiResult<ApiResponse> {
    let Json(request) = request?;
    let timer = state.timers.add(request.into_draft()).await?;
    state.record_action("add");
    info!("Add endpoint called - timer '{}' created", timer.name);
    respond(&state.timers, format!("Timer '{}' added", timer.name)).await
}

/// Handle POST /timers/:id/status - Set status and optionally remaining seconds
pub async fn status_change_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
    request: Result<Json<SetStatusRequest>, JsonRejection>,
) -> ApiResult<ApiResponse> {
    let Json(request) = request?;
    let timer = state
        .timers
        .set_status(id, request.status, request.remaining)
        .await?
        .ok_or_else(|| unknown_timer(id))?;
    state.record_action("set-status");
    respond(&state.timers, format!("Timer '{}' is {}", timer.name, timer.status)).await
}

/// Handle POST /timers/:id/start - Start counting down
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> ApiResult<ApiResponse> {
    let timer = state.timers.start(id).await?.ok_or_else(|| unknown_timer(id))?;
    state.record_action("start");
    respond(&state.timers, format!("Timer '{}' started", timer.name)).await
}

/// Handle POST /timers/:id/pause - Stop counting down
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> ApiResult<ApiResponse> {
    let timer = state.timers.pause(id).await?.ok_or_else(|| unknown_timer(id))?;
    state.record_action("pause");
    respond(&state.timers, format!("Timer '{}' paused", timer.name)).await
}

/// Handle POST /timers/:id/reset - Pause and refill
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> ApiResult<ApiResponse> {
    let timer = state.timers.reset(id).await?.ok_or_else(|| unknown_timer(id))?;
    state.record_action("reset");
    respond(&state.timers, format!("Timer '{}' reset", timer.name)).await
}

/// Handle POST /timers/:id/complete - Move a finished timer to the completed list
pub async fn complete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TimerId>,
) -> ApiResult<ApiResponse> {
    let done = match state.timers.complete(id).await? {
        CompleteOutcome::Completed(done) => done,
        CompleteOutcome::Unfinished(timer) => {
            return Err(ApiError::conflict(format!(
                "Timer '{}' still has {}s remaining",
                timer.name, timer.remaining
            )));
        }
        CompleteOutcome::Missing => return Err(unknown_timer(id)),
    };
    state.record_action("complete");
    respond(&state.timers, format!("Timer '{}' completed", done.timer.name)).await
}

/// Handle GET /status - Service metadata and timer counts
pub async fn status_handler(State(state): State<Arc<AppState>>) -> ApiResult<StatusResponse> {
    let snapshot = state.timers.latest();
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        active_timers: snapshot.timers.len(),
        running_timers: snapshot.timers.iter().filter(|t| t.status == TimerStatus::Running).count(),
        completed_timers: snapshot.completed_timers.len(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
