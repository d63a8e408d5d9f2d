//! Transport-side plumbing for the sensor pipelines.
//!
//! - [`NotificationBatch`] -- the inbound pub/sub delivery envelope.
//! - [`EventBus`] / [`PublishedMessage`] -- in-process fan-out of outbound
//!   messages, used when publishing locally.
//! - [`delivery`] -- the [`EventPublisher`] seam and its HTTP and bus
//!   implementations.
//! - [`LocalSink`] -- background task draining the bus into the log.

pub mod bus;
pub mod delivery;
pub mod envelope;
pub mod sink;

pub use bus::{EventBus, PublishedMessage};
pub use delivery::bus::BusPublisher;
pub use delivery::http::HttpPublisher;
pub use delivery::{publish_event, EventPublisher, PublishError};
pub use envelope::{EnvelopeError, NotificationBatch};
pub use sink::LocalSink;
