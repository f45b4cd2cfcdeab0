use axum::routing::get;
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                -> list_tasks
/// GET    /{id}            -> get_task
/// GET    /{id}/status     -> get_task_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list_tasks))
        .route("/{id}", get(tasks::get_task))
        .route("/{id}/status", get(tasks::get_task_status))
}
