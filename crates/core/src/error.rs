use crate::types::SensorId;

/// Failure of the remote bounds provider.
///
/// A failed refresh never touches the cache: any previously cached entry
/// for the sensor stays in place.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The call itself failed (network, DNS, non-2xx status, ...).
    #[error("Bounds provider request failed for sensor {sensor_id}: {message}")]
    Request { sensor_id: SensorId, message: String },

    /// The provider answered but the payload lacks usable bounds.
    #[error("Bounds provider returned an invalid payload for sensor {sensor_id}: {message}")]
    InvalidPayload { sensor_id: SensorId, message: String },

    /// The call did not complete within the refresh timeout.
    #[error("Bounds refresh for sensor {sensor_id} timed out after {timeout_secs}s")]
    Timeout { sensor_id: SensorId, timeout_secs: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Publish failed: {0}")]
    Publish(String),
}
