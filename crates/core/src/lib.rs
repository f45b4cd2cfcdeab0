//! Domain types for the asynchronous task subsystem.
//!
//! Everything here is pure: no I/O, no async. The store, queue, worker and
//! API crates all build on these types so the state machine lives in exactly
//! one place.

pub mod backend_status;
pub mod error;
pub mod kind;
pub mod progress;
pub mod reconcile;
pub mod record;
pub mod result;
pub mod status;
pub mod types;
pub mod user;
