use std::sync::Arc;

use asyncops_db::store::TaskStore;
use asyncops_queue::QueueBackend;

use crate::config::ServerConfig;
use crate::engine::{TaskDispatcher, TaskReconciler};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Task record store, for listing and raw reads.
    pub tasks: Arc<dyn TaskStore>,
    /// Creates records and enqueues work.
    pub dispatcher: Arc<TaskDispatcher>,
    /// Serves reconciled status queries.
    pub reconciler: Arc<TaskReconciler>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the dispatcher and reconciler over one task store and queue.
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        queue: Arc<dyn QueueBackend>,
        config: ServerConfig,
    ) -> Self {
        Self {
            dispatcher: Arc::new(TaskDispatcher::new(Arc::clone(&tasks), Arc::clone(&queue))),
            reconciler: Arc::new(TaskReconciler::new(Arc::clone(&tasks), queue)),
            tasks,
            config: Arc::new(config),
        }
    }
}
