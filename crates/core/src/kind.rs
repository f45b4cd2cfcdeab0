//! The catalogue of task kinds a worker knows how to execute.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::Operation;

/// Table name recorded as provenance for every user task.
pub const RELATED_TABLE_USER: &str = "user";

/// Logical operation name stored as `task_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    CreateEntity,
    UpdateEntity,
    DeleteEntity,
    GetEntity,
    ListEntities,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::CreateEntity,
        TaskKind::UpdateEntity,
        TaskKind::DeleteEntity,
        TaskKind::GetEntity,
        TaskKind::ListEntities,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::CreateEntity => "create_entity",
            TaskKind::UpdateEntity => "update_entity",
            TaskKind::DeleteEntity => "delete_entity",
            TaskKind::GetEntity => "get_entity",
            TaskKind::ListEntities => "list_entities",
        }
    }

    /// CRUD verb recorded alongside this kind.
    pub fn operation(self) -> Operation {
        match self {
            TaskKind::CreateEntity => Operation::Create,
            TaskKind::UpdateEntity => Operation::Update,
            TaskKind::DeleteEntity => Operation::Delete,
            TaskKind::GetEntity | TaskKind::ListEntities => Operation::Read,
        }
    }

    /// Number of progress checkpoints the worker reports for this kind.
    pub fn total_steps(self) -> u32 {
        match self {
            TaskKind::CreateEntity => 5,
            TaskKind::UpdateEntity => 4,
            TaskKind::DeleteEntity => 3,
            TaskKind::GetEntity | TaskKind::ListEntities => 2,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown task name: {s}")))
    }
}
