//! Inbound batch envelope.
//!
//! The transport delivers a batch as
//! `{"Records": [{"Sns": {"Message": "<json string>"}}, ...]}`. Each
//! `Message` is the serialized reading (or average event) to process.
//! Record order is delivery order and is preserved.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The batch body is not a valid envelope.
    #[error("Malformed batch envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// A record carries no message body.
    #[error("Record {index} has no message body")]
    MissingMessage { index: usize },
}

/// One delivered batch of notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationBatch {
    /// A batch without `Records` is treated as empty.
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "Sns", default)]
    pub sns: Option<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "Message", default)]
    pub message: Option<String>,

    #[serde(rename = "MessageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl NotificationBatch {
    /// Parse a batch from a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Wrap already-serialized messages into a batch, in order.
    pub fn from_messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            records: messages
                .into_iter()
                .map(|m| NotificationRecord {
                    sns: Some(Notification {
                        message: Some(m.into()),
                        message_id: None,
                    }),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Message bodies in delivery order.
    ///
    /// A record without a body yields [`EnvelopeError::MissingMessage`] at
    /// its position; records after it are still yielded so the caller
    /// decides where to stop.
    pub fn messages(&self) -> impl Iterator<Item = Result<&str, EnvelopeError>> {
        self.records.iter().enumerate().map(|(index, record)| {
            record
                .sns
                .as_ref()
                .and_then(|sns| sns.message.as_deref())
                .ok_or(EnvelopeError::MissingMessage { index })
        })
    }
}
