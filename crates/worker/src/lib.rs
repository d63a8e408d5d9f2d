//! `sensorwatch-worker` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod provider;
pub mod router;
pub mod routes;
pub mod state;
