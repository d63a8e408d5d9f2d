//! Outbound delivery of derived events.
//!
//! Pipelines publish through the [`EventPublisher`] seam so the
//! destination transport can be swapped: [`http::HttpPublisher`] posts to
//! remote endpoints, [`bus::BusPublisher`] keeps everything in-process.
//! Delivery is attempted once; redelivery is the transport's concern.

pub mod bus;
pub mod http;

use async_trait::async_trait;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The event could not be turned into a JSON payload.
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("Publish request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The destination answered with a non-2xx status code.
    #[error("Destination {destination} returned HTTP {status}")]
    HttpStatus { destination: String, status: u16 },
}

// ---------------------------------------------------------------------------
// EventPublisher
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Send one JSON payload to `destination`.
    async fn publish(
        &self,
        destination: &str,
        payload: &serde_json::Value,
    ) -> Result<(), PublishError>;
}

/// Serialize `event` and publish it to `destination`.
pub async fn publish_event<T: Serialize + ?Sized>(
    publisher: &dyn EventPublisher,
    destination: &str,
    event: &T,
) -> Result<(), PublishError> {
    let payload = serde_json::to_value(event)?;
    publisher.publish(destination, &payload).await
}
