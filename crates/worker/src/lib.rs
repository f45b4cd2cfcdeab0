//! Worker side of the task subsystem.
//!
//! [`contract::TaskExecutor`] runs one delivered work item through the claim,
//! progress and terminal-write lifecycle; [`operations`] holds the per-kind
//! business handlers; [`runner`] drives executors from the queue.

pub mod config;
pub mod contract;
pub mod error;
pub mod operations;
pub mod pacing;
pub mod runner;

pub use config::WorkerConfig;
pub use contract::{Outcome, TaskExecutor};
pub use error::TaskFailure;
