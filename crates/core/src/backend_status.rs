//! Queue backend status vocabulary and its mapping onto [`TaskStatus`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::TaskStatus;

/// Authoritative execution status reported by the queue backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BackendStatus {
    /// Enqueued, not yet picked up.
    Queued,
    /// A worker has claimed the item.
    Started,
    /// The worker acknowledged success with this result.
    Succeeded { result: serde_json::Value },
    /// The worker gave up on the item with this error.
    Failed { error: String },
    /// The backend has no record of the identifier.
    Unknown,
}

impl BackendStatus {
    /// Native label as stored by queue adapters.
    pub fn label(&self) -> &'static str {
        match self {
            BackendStatus::Queued => "queued",
            BackendStatus::Started => "started",
            BackendStatus::Succeeded { .. } => "succeeded",
            BackendStatus::Failed { .. } => "failed",
            BackendStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a backend status onto the four-state model.
///
/// `Unknown` carries no information and maps to `None`.
pub fn map_backend_status(status: &BackendStatus) -> Option<TaskStatus> {
    match status {
        BackendStatus::Queued => Some(TaskStatus::Pending),
        BackendStatus::Started => Some(TaskStatus::Processing),
        BackendStatus::Succeeded { .. } => Some(TaskStatus::Done),
        BackendStatus::Failed { .. } => Some(TaskStatus::Failed),
        BackendStatus::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn maps_each_backend_state() {
        assert_eq!(
            map_backend_status(&BackendStatus::Queued),
            Some(TaskStatus::Pending)
        );
        assert_eq!(
            map_backend_status(&BackendStatus::Started),
            Some(TaskStatus::Processing)
        );
        assert_eq!(
            map_backend_status(&BackendStatus::Succeeded { result: json!({}) }),
            Some(TaskStatus::Done)
        );
        assert_eq!(
            map_backend_status(&BackendStatus::Failed {
                error: "x".into()
            }),
            Some(TaskStatus::Failed)
        );
        assert_eq!(map_backend_status(&BackendStatus::Unknown), None);
    }

    #[test]
    fn serializes_with_state_tag() {
        let status = BackendStatus::Failed {
            error: "boom".into(),
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"state": "failed", "error": "boom"})
        );
    }
}
