//! Taskdeck board service — library crate for integration testing.
//!
//! Re-exports modules needed by integration tests in `tests/`.

pub mod board;
pub mod cache;
pub mod config;
pub mod errors;
pub mod license;
pub mod middleware;
pub mod models;
pub mod store;
