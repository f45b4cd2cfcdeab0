//! Long-lived loops that pull work from the queue.
//!
//! Each [`WorkerLoop`] polls every `poll_interval` and drains the queue
//! before sleeping again. An in-flight task is never interrupted: shutdown
//! takes effect between items.

use std::sync::Arc;
use std::time::Duration;

use asyncops_queue::QueueBackend;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::contract::TaskExecutor;

/// How often the redelivery sweeper runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// One worker: claims items and hands them to the executor.
pub struct WorkerLoop {
    worker_id: String,
    executor: Arc<TaskExecutor>,
    queue: Arc<dyn QueueBackend>,
    poll_interval: Duration,
}

impl WorkerLoop {
    pub fn new(
        worker_id: impl Into<String>,
        executor: Arc<TaskExecutor>,
        queue: Arc<dyn QueueBackend>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            executor,
            queue,
            poll_interval,
        }
    }

    /// Run until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            worker_id = %self.worker_id,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker loop started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(worker_id = %self.worker_id, "Worker loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.drain(&cancel).await;
                }
            }
        }
    }

    /// Process queued items until the queue is empty or shutdown begins.
    /// Returns how many items were executed.
    pub async fn drain(&self, cancel: &CancellationToken) -> usize {
        let mut executed = 0;
        while !cancel.is_cancelled() {
            match self.queue.claim_next(&self.worker_id).await {
                Ok(Some(delivery)) => {
                    let outcome = self.executor.execute(&delivery).await;
                    tracing::debug!(
                        worker_id = %self.worker_id,
                        task_id = %delivery.item.id,
                        ?outcome,
                        "Work item settled",
                    );
                    executed += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(worker_id = %self.worker_id, error = %e, "Queue claim failed");
                    break;
                }
            }
        }
        executed
    }
}

/// Periodically returns stale started items to the queue.
pub struct RedeliverySweeper {
    queue: Arc<dyn QueueBackend>,
    visibility_timeout: Duration,
    interval: Duration,
}

impl RedeliverySweeper {
    pub fn new(queue: Arc<dyn QueueBackend>, visibility_timeout: Duration) -> Self {
        Self {
            queue,
            visibility_timeout,
            interval: SWEEP_INTERVAL.min(visibility_timeout.max(Duration::from_secs(1))),
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        tracing::info!(
            visibility_timeout_secs = self.visibility_timeout.as_secs(),
            "Redelivery sweeper started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Redelivery sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.queue.requeue_stale(self.visibility_timeout).await {
                        Ok(0) => {}
                        Ok(n) => tracing::warn!(requeued = n, "Redelivering stale work items"),
                        Err(e) => tracing::error!(error = %e, "Redelivery sweep failed"),
                    }
                }
            }
        }
    }
}

/// Spawn `config.concurrency` worker loops plus one redelivery sweeper.
pub fn spawn_workers(
    name: &str,
    executor: Arc<TaskExecutor>,
    queue: Arc<dyn QueueBackend>,
    config: &WorkerConfig,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(config.concurrency + 1);

    for n in 0..config.concurrency {
        let worker = WorkerLoop::new(
            format!("{name}-{n}"),
            Arc::clone(&executor),
            Arc::clone(&queue),
            config.poll_interval,
        );
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move { worker.run(cancel).await }));
    }

    let sweeper = RedeliverySweeper::new(queue, config.visibility_timeout);
    let cancel = cancel.clone();
    handles.push(tokio::spawn(async move { sweeper.run(cancel).await }));

    handles
}
