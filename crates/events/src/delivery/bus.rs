//! In-process delivery onto the [`EventBus`].

use std::sync::Arc;

use async_trait::async_trait;

use super::{EventPublisher, PublishError};
use crate::bus::{EventBus, PublishedMessage};

/// Publishes every payload as a [`PublishedMessage`] on a shared bus.
///
/// Never fails: with no subscribers the message is dropped and logged.
pub struct BusPublisher {
    bus: Arc<EventBus>,
}

impl BusPublisher {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl EventPublisher for BusPublisher {
    async fn publish(
        &self,
        destination: &str,
        payload: &serde_json::Value,
    ) -> Result<(), PublishError> {
        let delivered = self
            .bus
            .publish(PublishedMessage::new(destination, payload.clone()));
        if delivered == 0 {
            tracing::debug!(destination, "No bus subscribers, message dropped");
        }
        Ok(())
    }
}
