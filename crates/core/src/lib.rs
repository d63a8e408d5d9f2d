//! Sensor telemetry domain logic.
//!
//! Everything in this crate is transport-agnostic: readings come in as
//! parsed [`Reading`](reading::Reading) values and derived events go out
//! as plain structs. HTTP, pub/sub envelopes and publishing live in the
//! `sensorwatch-events` and `sensorwatch-worker` crates.
//!
//! - [`bounds`] -- per-sensor bounds cache with read-through refresh.
//! - [`classifier`] -- low/high classification against cached bounds.
//! - [`accumulator`] -- window-then-reset averaging buffers.
//! - [`report`] -- human-readable rendering of average events.

pub mod accumulator;
pub mod bounds;
pub mod classifier;
pub mod clock;
pub mod env_names;
pub mod error;
pub mod reading;
pub mod report;
pub mod types;
