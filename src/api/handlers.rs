//! Control-plane request handlers.
//!
//! Handlers translate wire requests into queue operations (enqueue,
//! snapshot, delete) and tasks back into wire objects. The queue and the
//! archive are the only state they touch.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::core::types::TaskId;
use crate::probes::ProbeSpec;
use crate::queue::TaskQueue;
use crate::scheduler::{Archive, SchedulerHandle, SchedulerState};

use super::errors::ApiError;
use super::wire::TaskWire;

/// Shared state for the control-plane handlers.
#[derive(Clone)]
pub struct ApiState {
    pub queue: Arc<TaskQueue>,
    pub archive: Arc<Archive>,
    pub handle: SchedulerHandle,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub scheduler: &'static str,
}

/// Health check.
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let scheduler = match state.handle.state().await {
        SchedulerState::Running => "running",
        SchedulerState::Stopped => "stopped",
    };
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        scheduler,
    })
}

/// GET /tasks: every currently queued task.
pub async fn get_tasks(State(state): State<ApiState>) -> Json<Vec<TaskWire>> {
    let tasks = state.queue.snapshot().await;
    Json(tasks.iter().map(TaskWire::from_task).collect())
}

/// GET /tasks/{id}: one task, from the queue or the archive of completed
/// tasks.
pub async fn get_task(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<Json<TaskWire>, ApiError> {
    let id = TaskId::new(id);

    if let Some(task) = state.queue.snapshot().await.iter().find(|t| t.id() == id) {
        return Ok(Json(TaskWire::from_task(task)));
    }
    if let Some(task) = state.archive.get(id).await {
        return Ok(Json(TaskWire::from_task(&task)));
    }

    Err(ApiError::TaskNotFound(id))
}

/// POST /tasks: schedule a new task.
///
/// The body is inspected before typed parsing so an unknown `type` gets the
/// dedicated 501 answer rather than a generic parse failure.
pub async fn post_tasks(
    State(state): State<ApiState>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let kind = body
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::BadRequest("missing task type".to_string()))?;
    if !ProbeSpec::is_known(kind) {
        return Err(ApiError::TypeNotFound);
    }

    let wire: TaskWire =
        serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let task = wire
        .into_task()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let id = task.id();
    let kind = task.probe().kind();
    if !state.queue.enqueue_unique(task).await {
        return Err(ApiError::DuplicateTask(id));
    }

    tracing::info!(task_id = %id, probe = kind, "task accepted");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /tasks: remove a task by id, `{"task_id": id}`.
pub async fn delete_task(
    State(state): State<ApiState>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let id = body
        .get("task_id")
        .and_then(Value::as_u64)
        .ok_or_else(|| ApiError::BadRequest("Expecting {\"task_id\": id}".to_string()))?;

    // Removing an absent id is a no-op, not an error.
    let removed = state.queue.remove_by_id(TaskId::new(id)).await;
    tracing::info!(task_id = id, removed, "delete task");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /results: result histories of every queued and archived task, one
/// `{<task_id>: [report, ...]}` entry per task.
pub async fn get_results(State(state): State<ApiState>) -> Json<Vec<Value>> {
    let mut entries = Vec::new();
    for task in state.queue.snapshot().await {
        entries.push(serde_json::json!({
            task.id().to_string(): task.results().snapshot()
        }));
    }
    for task in state.archive.snapshot().await {
        entries.push(serde_json::json!({
            task.id().to_string(): task.results().snapshot()
        }));
    }
    Json(entries)
}
