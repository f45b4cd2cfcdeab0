//! In-process queue for the `memory` backend and tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use asyncops_core::backend_status::BackendStatus;
use asyncops_core::progress;
use asyncops_core::types::TaskId;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{Delivery, QueueBackend, QueueError, WorkItem};

#[derive(Debug, Clone)]
enum EntryState {
    Queued,
    Started { since: Instant },
    Succeeded(serde_json::Value),
    Failed(String),
}

#[derive(Debug)]
struct Entry {
    item: WorkItem,
    state: EntryState,
    progress: u8,
    attempts: i32,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<TaskId, Entry>,
    ready: VecDeque<TaskId>,
}

impl State {
    /// Only a started item can be settled; a late ack or nack for an item
    /// that is queued or already settled is dropped.
    fn started_mut(&mut self, id: &TaskId) -> Option<&mut Entry> {
        match self.entries.get_mut(id) {
            Some(entry) if matches!(entry.state, EntryState::Started { .. }) => Some(entry),
            Some(entry) => {
                tracing::debug!(task_id = %id, state = ?entry.state, "Ignoring settle of unstarted work item");
                None
            }
            None => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<State>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items waiting to be claimed.
    pub async fn queued_len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    /// Last advisory progress reported for `id`.
    pub async fn reported_progress(&self, id: &TaskId) -> Option<u8> {
        self.state.lock().await.entries.get(id).map(|e| e.progress)
    }
}

#[async_trait]
impl QueueBackend for MemoryQueue {
    async fn enqueue(&self, item: &WorkItem) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.entries.insert(
            item.id.clone(),
            Entry {
                item: item.clone(),
                state: EntryState::Queued,
                progress: 0,
                attempts: 0,
            },
        );
        state.ready.push_back(item.id.clone());
        Ok(())
    }

    async fn status(&self, id: &TaskId) -> Result<BackendStatus, QueueError> {
        let state = self.state.lock().await;
        let status = match state.entries.get(id).map(|e| &e.state) {
            None => BackendStatus::Unknown,
            Some(EntryState::Queued) => BackendStatus::Queued,
            Some(EntryState::Started { .. }) => BackendStatus::Started,
            Some(EntryState::Succeeded(result)) => BackendStatus::Succeeded {
                result: result.clone(),
            },
            Some(EntryState::Failed(error)) => BackendStatus::Failed {
                error: error.clone(),
            },
        };
        Ok(status)
    }

    async fn claim_next(&self, worker: &str) -> Result<Option<Delivery>, QueueError> {
        let mut guard = self.state.lock().await;
        let State { entries, ready } = &mut *guard;
        while let Some(id) = ready.pop_front() {
            // Skip ids that were acked or nacked while still in the ready list.
            let Some(entry) = entries.get_mut(&id) else {
                continue;
            };
            if !matches!(entry.state, EntryState::Queued) {
                continue;
            }
            entry.state = EntryState::Started {
                since: Instant::now(),
            };
            entry.attempts += 1;
            tracing::debug!(task_id = %id, worker, attempt = entry.attempts, "Work item claimed");
            return Ok(Some(Delivery {
                item: entry.item.clone(),
                attempt: entry.attempts,
            }));
        }
        Ok(None)
    }

    async fn report_progress(&self, id: &TaskId, progress: u8) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.entries.get_mut(id) {
            entry.progress = progress::advance(entry.progress, progress);
        }
        Ok(())
    }

    async fn ack(&self, id: &TaskId, result: &serde_json::Value) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.started_mut(id) {
            entry.state = EntryState::Succeeded(result.clone());
            entry.progress = progress::PROGRESS_COMPLETE;
        }
        Ok(())
    }

    async fn nack(&self, id: &TaskId, error: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.started_mut(id) {
            entry.state = EntryState::Failed(error.to_string());
        }
        Ok(())
    }

    async fn requeue_stale(&self, visibility_timeout: Duration) -> Result<u64, QueueError> {
        let mut guard = self.state.lock().await;
        let State { entries, ready } = &mut *guard;
        let mut requeued = 0;
        for (id, entry) in entries.iter_mut() {
            if let EntryState::Started { since } = entry.state {
                if since.elapsed() >= visibility_timeout {
                    entry.state = EntryState::Queued;
                    ready.push_back(id.clone());
                    requeued += 1;
                }
            }
        }
        Ok(requeued)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use asyncops_core::kind::TaskKind;
    use serde_json::json;

    use super::*;

    fn item(id: &str) -> WorkItem {
        WorkItem {
            id: TaskId::from(id),
            task_name: TaskKind::ListEntities,
            payload: json!({}),
        }
    }

    #[tokio::test]
    async fn claims_in_fifo_order() {
        let queue = MemoryQueue::new();
        queue.enqueue(&item("a")).await.unwrap();
        queue.enqueue(&item("b")).await.unwrap();

        let first = queue.claim_next("w").await.unwrap().unwrap();
        let second = queue.claim_next("w").await.unwrap().unwrap();
        assert_eq!(first.item.id.as_str(), "a");
        assert_eq!(second.item.id.as_str(), "b");
        assert!(queue.claim_next("w").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_follows_item_lifecycle() {
        let queue = MemoryQueue::new();
        let id = TaskId::from("a");
        assert_eq!(queue.status(&id).await.unwrap(), BackendStatus::Unknown);

        queue.enqueue(&item("a")).await.unwrap();
        assert_eq!(queue.status(&id).await.unwrap(), BackendStatus::Queued);

        queue.claim_next("w").await.unwrap();
        assert_eq!(queue.status(&id).await.unwrap(), BackendStatus::Started);

        queue.nack(&id, "boom").await.unwrap();
        assert_matches!(
            queue.status(&id).await.unwrap(),
            BackendStatus::Failed { error } if error == "boom"
        );
    }

    #[tokio::test]
    async fn settled_items_are_not_overwritten() {
        let queue = MemoryQueue::new();
        let id = TaskId::from("a");
        queue.enqueue(&item("a")).await.unwrap();

        // Not started yet: nothing to settle.
        queue.ack(&id, &json!({ "success": true })).await.unwrap();
        assert_eq!(queue.status(&id).await.unwrap(), BackendStatus::Queued);

        queue.claim_next("w").await.unwrap();
        queue.ack(&id, &json!({ "success": true })).await.unwrap();
        queue.nack(&id, "late duplicate").await.unwrap();
        assert_matches!(
            queue.status(&id).await.unwrap(),
            BackendStatus::Succeeded { result } if result["success"] == json!(true)
        );
    }

    #[tokio::test]
    async fn advisory_progress_never_decreases() {
        let queue = MemoryQueue::new();
        let id = TaskId::from("a");
        queue.enqueue(&item("a")).await.unwrap();
        queue.report_progress(&id, 40).await.unwrap();
        queue.report_progress(&id, 20).await.unwrap();
        assert_eq!(queue.reported_progress(&id).await, Some(40));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_started_items_are_redelivered() {
        let queue = MemoryQueue::new();
        queue.enqueue(&item("a")).await.unwrap();
        queue.claim_next("w").await.unwrap();

        assert_eq!(queue.requeue_stale(Duration::from_secs(30)).await.unwrap(), 0);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(queue.requeue_stale(Duration::from_secs(30)).await.unwrap(), 1);

        let again = queue.claim_next("w").await.unwrap().unwrap();
        assert_eq!(again.attempt, 2);
        assert!(again.is_redelivery());
    }
}
