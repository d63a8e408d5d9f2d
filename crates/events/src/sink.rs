//! Local sink for bus-published messages.
//!
//! [`LocalSink`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! logs every [`PublishedMessage`] it receives. It runs as a long-lived
//! background task and exits once the bus sender is dropped.

use tokio::sync::broadcast;

use crate::bus::PublishedMessage;

pub struct LocalSink;

impl LocalSink {
    /// Drain `receiver` until the channel closes.
    ///
    /// Returns the number of messages logged.
    pub async fn run(mut receiver: broadcast::Receiver<PublishedMessage>) -> u64 {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(message) => {
                    logged += 1;
                    tracing::info!(
                        destination = %message.destination,
                        published_at = %message.published_at,
                        payload = %message.payload,
                        "Published message"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Local sink lagged, some messages were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, local sink shutting down");
                    break;
                }
            }
        }
        logged
    }
}
