//! Handlers for the `/users` resource.
//!
//! Every endpoint only submits a task and answers `202 Accepted`; the
//! outcome is read back through the task status endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use asyncops_core::kind::{TaskKind, RELATED_TABLE_USER};
use asyncops_core::user::{validate_input, CreateUser, UpdateUser, UserPatch, UserRef};

use crate::engine::Submission;
use crate::error::{AppError, AppResult};
use crate::response::TaskAccepted;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_input<T: serde::Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::InternalError(e.to_string()))
}

async fn accept(
    state: &AppState,
    task_name: TaskKind,
    related_id: Option<String>,
    input_data: serde_json::Value,
    message: String,
) -> AppResult<impl IntoResponse> {
    let submitted = state
        .dispatcher
        .submit(Submission {
            task_name,
            related_table: Some(RELATED_TABLE_USER.to_string()),
            related_id,
            operation: Some(task_name.operation()),
            input_data,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TaskAccepted {
            task_id: submitted.task_id.into_inner(),
            message,
            status_endpoint: submitted.status_path,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/users
pub async fn list_users(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    accept(
        &state,
        TaskKind::ListEntities,
        None,
        serde_json::json!({}),
        "Task created to list all users".to_string(),
    )
    .await
}

/// POST /api/v1/users
///
/// Input is validated up front; invalid input is a 400 and no task is
/// created.
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    validate_input(&input)?;
    let message = format!("Task created to create user {}", input.username);
    accept(
        &state,
        TaskKind::CreateEntity,
        None,
        to_input(&input)?,
        message,
    )
    .await
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let message = format!("Task created to retrieve user {user_id}");
    let input = to_input(&UserRef {
        user_id: user_id.clone(),
    })?;
    accept(&state, TaskKind::GetEntity, Some(user_id), input, message).await
}

/// PUT|PATCH /api/v1/users/{id}
///
/// Both verbs accept partial input; only provided fields are applied.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(data) = payload?;
    validate_input(&data)?;
    let message = format!("Task created to update user {user_id}");
    let input = to_input(&UserPatch {
        user_id: user_id.clone(),
        data,
    })?;
    accept(&state, TaskKind::UpdateEntity, Some(user_id), input, message).await
}

/// DELETE /api/v1/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let message = format!("Task created to delete user {user_id}");
    let input = to_input(&UserRef {
        user_id: user_id.clone(),
    })?;
    accept(&state, TaskKind::DeleteEntity, Some(user_id), input, message).await
}
