//! Request-side halves of the task subsystem.

pub mod dispatch;
pub mod reconcile;

pub use dispatch::{status_path, Submission, Submitted, TaskDispatcher};
pub use reconcile::TaskReconciler;
