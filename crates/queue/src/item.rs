use asyncops_core::kind::TaskKind;
use asyncops_core::types::TaskId;
use serde::{Deserialize, Serialize};

/// What the dispatcher hands to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: TaskId,
    pub task_name: TaskKind,
    pub payload: serde_json::Value,
}

/// A claimed work item. `attempt` starts at 1 and grows on redelivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub item: WorkItem,
    pub attempt: i32,
}

impl Delivery {
    pub fn is_redelivery(&self) -> bool {
        self.attempt > 1
    }
}
