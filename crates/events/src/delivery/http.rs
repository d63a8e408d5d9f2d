//! HTTP delivery of derived events.
//!
//! [`HttpPublisher`] POSTs the JSON payload to the destination, which is
//! expected to be an absolute URL. One attempt per message.

use std::time::Duration;

use async_trait::async_trait;

use super::{EventPublisher, PublishError};

/// Delivers payloads to HTTP destinations over a shared client.
pub struct HttpPublisher {
    client: reqwest::Client,
}

impl HttpPublisher {
    /// Create a publisher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventPublisher for HttpPublisher {
    async fn publish(
        &self,
        destination: &str,
        payload: &serde_json::Value,
    ) -> Result<(), PublishError> {
        let response = self.client.post(destination).json(payload).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::warn!(destination, status, "Destination rejected published message");
            return Err(PublishError::HttpStatus {
                destination: destination.to_string(),
                status,
            });
        }

        tracing::debug!(destination, "Message published");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
