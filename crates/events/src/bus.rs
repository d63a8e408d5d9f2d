//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] carries every [`PublishedMessage`] produced while running
//! with local publishing. It is designed to be shared via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PublishedMessage
// ---------------------------------------------------------------------------

/// An outbound message together with the destination it was sent to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedMessage {
    /// Destination identifier, e.g. the low-values topic.
    pub destination: String,

    /// The JSON body as it would be sent to the destination.
    pub payload: serde_json::Value,

    /// When the message was published (UTC).
    pub published_at: DateTime<Utc>,
}

impl PublishedMessage {
    pub fn new(destination: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            destination: destination.into(),
            payload,
            published_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus.
///
/// # Usage
///
/// ```rust
/// use sensorwatch_events::bus::{EventBus, PublishedMessage};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PublishedMessage::new("low-sensor-data", serde_json::json!({})));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PublishedMessage>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a message to all current subscribers.
    ///
    /// Returns the number of subscribers that will see it; zero means the
    /// message was dropped.
    pub fn publish(&self, message: PublishedMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
