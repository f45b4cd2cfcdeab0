//! Handlers for the `/tasks` resource.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use asyncops_core::error::CoreError;
use asyncops_core::record::{TaskFilter, TaskSummary};
use asyncops_core::types::TaskId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/tasks
///
/// Administrative listing. Supports optional `status`, `task_name`,
/// `related_table`, `operation`, `limit` and `offset` query parameters.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(filter): Query<TaskFilter>,
) -> AppResult<impl IntoResponse> {
    let records = state.tasks.list(&filter).await?;
    let data: Vec<TaskSummary> = records.iter().map(TaskSummary::from).collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/tasks/{id}
///
/// The stored record as-is, without consulting the queue.
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = TaskId::from(id);
    let record = state
        .tasks
        .get(&id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "Task",
            id: id.to_string(),
        })?;
    Ok(Json(DataResponse { data: record }))
}

/// GET /api/v1/tasks/{id}/status
///
/// The reconciled record: drift against the queue is repaired first.
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let record = state.reconciler.get_status(&TaskId::from(id)).await?;
    Ok(Json(DataResponse { data: record }))
}
