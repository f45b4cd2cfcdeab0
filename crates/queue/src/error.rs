#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored item could not be decoded.
    #[error("Malformed work item {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}
