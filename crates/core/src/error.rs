use crate::status::TaskStatus;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A status change the state machine forbids. Worker logic can never
    /// produce one, so observing this means a bug or a corrupted record.
    #[error("Illegal task transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Internal error: {0}")]
    Internal(String),
}
