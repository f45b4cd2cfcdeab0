use asyncops_core::error::CoreError;
use asyncops_core::user::not_found_message;
use asyncops_db::StoreError;

/// Why a task ended `FAILED`. The `Display` form is what lands in
/// `result.error`.
#[derive(Debug, thiserror::Error)]
pub enum TaskFailure {
    /// The target user does not exist.
    #[error("{}", not_found_message(.user_id))]
    NotFound { user_id: String },

    /// A unique field is already taken.
    #[error("{0}")]
    Conflict(String),

    /// `input_data` could not be decoded or failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The record or entity store failed mid-task.
    #[error("{0}")]
    Persistence(StoreError),

    /// The handler panicked or was cancelled.
    #[error("Task aborted: {0}")]
    Aborted(String),
}

impl From<StoreError> for TaskFailure {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(CoreError::Conflict(msg)) => TaskFailure::Conflict(msg),
            StoreError::Core(CoreError::Validation(msg)) => TaskFailure::InvalidInput(msg),
            other => TaskFailure::Persistence(other),
        }
    }
}

impl From<CoreError> for TaskFailure {
    fn from(err: CoreError) -> Self {
        StoreError::Core(err).into()
    }
}

impl From<serde_json::Error> for TaskFailure {
    fn from(err: serde_json::Error) -> Self {
        TaskFailure::InvalidInput(err.to_string())
    }
}
