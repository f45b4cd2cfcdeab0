use std::time::Duration;

use crate::pacing::StepPacing;

/// Worker runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of parallel worker loops.
    pub concurrency: usize,
    /// How often an idle loop polls the queue.
    pub poll_interval: Duration,
    /// Started items older than this are redelivered.
    pub visibility_timeout: Duration,
    /// Simulated per-step duration.
    pub pacing: StepPacing,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_millis(500),
            visibility_timeout: Duration::from_secs(300),
            pacing: StepPacing::none(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `WORKER_CONCURRENCY`      | `4`     |
    /// | `WORKER_POLL_INTERVAL_MS` | `500`   |
    /// | `VISIBILITY_TIMEOUT_SECS` | `300`   |
    /// | `STEP_DELAY_MIN_MS`       | `0`     |
    /// | `STEP_DELAY_MAX_MS`       | `0`     |
    pub fn from_env() -> Self {
        let concurrency: usize = std::env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WORKER_CONCURRENCY must be a valid usize");

        let poll_interval_ms: u64 = std::env::var("WORKER_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("WORKER_POLL_INTERVAL_MS must be a valid u64");

        let visibility_timeout_secs: u64 = std::env::var("VISIBILITY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("VISIBILITY_TIMEOUT_SECS must be a valid u64");

        let step_delay_min_ms: u64 = std::env::var("STEP_DELAY_MIN_MS")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .expect("STEP_DELAY_MIN_MS must be a valid u64");

        let step_delay_max_ms: u64 = std::env::var("STEP_DELAY_MAX_MS")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .expect("STEP_DELAY_MAX_MS must be a valid u64");

        Self {
            concurrency: concurrency.max(1),
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
            visibility_timeout: Duration::from_secs(visibility_timeout_secs),
            pacing: StepPacing::new(
                Duration::from_millis(step_delay_min_ms),
                Duration::from_millis(step_delay_max_ms),
            ),
        }
    }
}
