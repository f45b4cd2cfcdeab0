//! Shared response envelope types for API handlers.
//!
//! Record responses use a `{ "data": ... }` envelope. Submissions answer with
//! [`TaskAccepted`] directly.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Body of a `202 Accepted` submission response.
#[derive(Debug, Serialize)]
pub struct TaskAccepted {
    pub task_id: String,
    pub message: String,
    pub status_endpoint: String,
}
