//! Inbound sensor readings.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EpochTime, SensorId};

/// A single measurement as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub sensor_id: SensorId,
    pub value: f64,
    pub timestamp: EpochTime,
}

impl Reading {
    pub fn new(
        sensor_id: impl Into<SensorId>,
        value: f64,
        timestamp: impl Into<EpochTime>,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            value,
            timestamp: timestamp.into(),
        }
    }

    /// Parse a reading from its JSON message body.
    ///
    /// `sensorId`, `value` and `timestamp` are all required; a payload that
    /// is not JSON or lacks any of them is [`CoreError::MalformedInput`].
    pub fn from_json(message: &str) -> Result<Self, CoreError> {
        let reading: Reading = serde_json::from_str(message)
            .map_err(|e| CoreError::MalformedInput(format!("invalid reading payload: {e}")))?;

        if reading.sensor_id.is_empty() {
            return Err(CoreError::MalformedInput(
                "reading has an empty sensorId".to_string(),
            ));
        }

        Ok(reading)
    }
}
