use asyncops_core::error::CoreError;
use asyncops_core::status::TaskStatus;

/// Errors raised by [`TaskStore`](crate::store::TaskStore) and
/// [`UserStore`](crate::store::UserStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Domain-level failure: not found, conflict, illegal transition.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The database itself failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::Core(CoreError::NotFound {
            entity,
            id: id.into(),
        })
    }

    pub fn invalid_transition(from: TaskStatus, to: TaskStatus) -> Self {
        StoreError::Core(CoreError::InvalidTransition { from, to })
    }

    /// The status the record already ended in, when this error is a write
    /// rejected because the record is terminal.
    pub fn terminal_conflict(&self) -> Option<TaskStatus> {
        match self {
            StoreError::Core(CoreError::InvalidTransition { from, .. }) if from.is_terminal() => {
                Some(*from)
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::Core(CoreError::NotFound { .. })
                | StoreError::Database(sqlx::Error::RowNotFound)
        )
    }
}

/// Map a PostgreSQL unique violation (SQLSTATE 23505) on a `uq_` constraint
/// to [`CoreError::Conflict`]; pass everything else through.
pub fn classify_unique_violation(err: sqlx::Error, describe: impl Fn(&str) -> String) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return StoreError::Core(CoreError::Conflict(describe(constraint)));
            }
        }
    }
    StoreError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_conflict_only_for_finished_records() {
        let done = StoreError::invalid_transition(TaskStatus::Done, TaskStatus::Processing);
        assert_eq!(done.terminal_conflict(), Some(TaskStatus::Done));

        let pending = StoreError::invalid_transition(TaskStatus::Pending, TaskStatus::Done);
        assert_eq!(pending.terminal_conflict(), None);
        assert_eq!(StoreError::not_found("Task", "t-1").terminal_conflict(), None);
    }
}
