//! Row structs matching the database tables.
//!
//! Rows hold raw column values; conversion into the domain types in
//! `asyncops_core` validates labels and payload shapes.

pub mod task;
pub mod user;
