//! Typed task outcome.
//!
//! A task's `result` is one of three shapes, each serialized as a flat JSON
//! object that always carries the reserved `progress` key:
//!
//! ```text
//! InProgress  {"progress": 40}
//! Succeeded   {"success": true, ...payload keys..., "progress": 100}
//! Failed      {"error": "...", "progress": 40}
//! ```

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::CoreError;
use crate::kind::TaskKind;
use crate::progress::PROGRESS_COMPLETE;
use crate::status::TaskStatus;
use crate::user::User;

/// Operation-specific success payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SuccessPayload {
    Create { entity_id: String, message: String },
    Update { entity_id: String, message: String },
    Delete { message: String },
    Get { user: User },
    List { users: Vec<User> },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedWire {
    entity_id: String,
    message: String,
}

#[derive(Deserialize)]
struct DeletedWire {
    message: String,
}

#[derive(Deserialize)]
struct FetchedWire {
    user: User,
}

#[derive(Deserialize)]
struct ListedWire {
    users: Vec<User>,
}

impl SuccessPayload {
    /// Payload keys only (no `success` / `progress`).
    pub fn to_json(&self) -> Map<String, Value> {
        let value = match self {
            SuccessPayload::Create { entity_id, message }
            | SuccessPayload::Update { entity_id, message } => {
                json!({ "entityId": entity_id, "message": message })
            }
            SuccessPayload::Delete { message } => json!({ "message": message }),
            SuccessPayload::Get { user } => json!({ "user": user }),
            SuccessPayload::List { users } => json!({ "users": users, "count": users.len() }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Decode a stored or backend-reported payload for a given task kind.
    ///
    /// Extra keys such as `success` and `progress` are ignored, so both the
    /// bare payload and the full result object are accepted.
    pub fn from_json(kind: TaskKind, value: &Value) -> Result<Self, CoreError> {
        let decode_err =
            |e: serde_json::Error| CoreError::Internal(format!("Malformed {kind} payload: {e}"));
        let payload = match kind {
            TaskKind::CreateEntity => {
                let w: SavedWire = serde_json::from_value(value.clone()).map_err(decode_err)?;
                SuccessPayload::Create {
                    entity_id: w.entity_id,
                    message: w.message,
                }
            }
            TaskKind::UpdateEntity => {
                let w: SavedWire = serde_json::from_value(value.clone()).map_err(decode_err)?;
                SuccessPayload::Update {
                    entity_id: w.entity_id,
                    message: w.message,
                }
            }
            TaskKind::DeleteEntity => {
                let w: DeletedWire = serde_json::from_value(value.clone()).map_err(decode_err)?;
                SuccessPayload::Delete { message: w.message }
            }
            TaskKind::GetEntity => {
                let w: FetchedWire = serde_json::from_value(value.clone()).map_err(decode_err)?;
                SuccessPayload::Get { user: w.user }
            }
            TaskKind::ListEntities => {
                let w: ListedWire = serde_json::from_value(value.clone()).map_err(decode_err)?;
                SuccessPayload::List { users: w.users }
            }
        };
        Ok(payload)
    }
}

/// Current outcome of a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    InProgress { progress: u8 },
    Succeeded { payload: SuccessPayload },
    Failed { progress: u8, error: String },
}

impl TaskResult {
    pub fn progress(&self) -> u8 {
        match self {
            TaskResult::InProgress { progress } | TaskResult::Failed { progress, .. } => *progress,
            TaskResult::Succeeded { .. } => PROGRESS_COMPLETE,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TaskResult::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Flat JSON representation with the reserved `progress` key.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        match self {
            TaskResult::InProgress { .. } => {}
            TaskResult::Succeeded { payload } => {
                map.insert("success".into(), Value::Bool(true));
                map.extend(payload.to_json());
            }
            TaskResult::Failed { error, .. } => {
                map.insert("error".into(), Value::String(error.clone()));
            }
        }
        map.insert("progress".into(), Value::from(self.progress()));
        Value::Object(map)
    }

    /// Rebuild a result from its persisted columns.
    ///
    /// `payload` is only read for `DONE`, `error` only for `FAILED`.
    pub fn from_parts(
        status: TaskStatus,
        kind: TaskKind,
        progress: u8,
        payload: Option<&Value>,
        error: Option<String>,
    ) -> Result<Self, CoreError> {
        match status {
            TaskStatus::Pending | TaskStatus::Processing => Ok(TaskResult::InProgress { progress }),
            TaskStatus::Done => {
                let payload = payload.ok_or_else(|| {
                    CoreError::Internal(format!("{kind} task is DONE without a payload"))
                })?;
                Ok(TaskResult::Succeeded {
                    payload: SuccessPayload::from_json(kind, payload)?,
                })
            }
            TaskStatus::Failed => Ok(TaskResult::Failed {
                progress,
                error: error.unwrap_or_default(),
            }),
        }
    }
}

impl Serialize for TaskResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "u-1".into(),
            username: "alice".into(),
            email: "a@x.com".into(),
            first_name: "Alice".into(),
            last_name: String::new(),
            is_active: true,
            date_joined: "2025-03-18T06:39:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn in_progress_serializes_progress_only() {
        let r = TaskResult::InProgress { progress: 40 };
        assert_eq!(r.to_json(), json!({"progress": 40}));
    }

    #[test]
    fn created_result_has_flat_shape() {
        let r = TaskResult::Succeeded {
            payload: SuccessPayload::Create {
                entity_id: "u-1".into(),
                message: "Successfully created user alice".into(),
            },
        };
        assert_eq!(
            r.to_json(),
            json!({
                "success": true,
                "entityId": "u-1",
                "message": "Successfully created user alice",
                "progress": 100
            })
        );
    }

    #[test]
    fn failed_result_keeps_last_progress() {
        let r = TaskResult::Failed {
            progress: 67,
            error: "boom".into(),
        };
        assert_eq!(r.to_json(), json!({"error": "boom", "progress": 67}));
        assert_eq!(r.error(), Some("boom"));
    }

    #[test]
    fn list_payload_carries_count() {
        let payload = SuccessPayload::List {
            users: vec![sample_user()],
        };
        let json = payload.to_json();
        assert_eq!(json["count"], 1);
        assert_eq!(json["users"][0]["username"], "alice");
    }

    #[test]
    fn full_result_object_decodes_as_payload() {
        let full = json!({
            "success": true,
            "entityId": "u-9",
            "message": "Successfully updated user bob",
            "progress": 100
        });
        let payload = SuccessPayload::from_json(TaskKind::UpdateEntity, &full).unwrap();
        assert_eq!(
            payload,
            SuccessPayload::Update {
                entity_id: "u-9".into(),
                message: "Successfully updated user bob".into()
            }
        );
    }

    #[test]
    fn get_payload_decodes_user() {
        let user = sample_user();
        let stored = Value::Object(SuccessPayload::Get { user: user.clone() }.to_json());
        let payload = SuccessPayload::from_json(TaskKind::GetEntity, &stored).unwrap();
        assert_eq!(payload, SuccessPayload::Get { user });
    }

    #[test]
    fn mismatched_payload_is_internal_error() {
        let err = SuccessPayload::from_json(TaskKind::GetEntity, &json!({"message": "x"}))
            .unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn done_without_payload_is_rejected() {
        assert!(TaskResult::from_parts(TaskStatus::Done, TaskKind::DeleteEntity, 100, None, None)
            .is_err());
    }

    #[test]
    fn failed_parts_keep_progress_and_error() {
        let r = TaskResult::from_parts(
            TaskStatus::Failed,
            TaskKind::DeleteEntity,
            33,
            None,
            Some("gone".into()),
        )
        .unwrap();
        assert_eq!(
            r,
            TaskResult::Failed {
                progress: 33,
                error: "gone".into()
            }
        );
    }
}
