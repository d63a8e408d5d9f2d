/// Sensors are identified by the opaque string carried in `sensorId`.
pub type SensorId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Epoch-like wire timestamp, integer or fractional, passed through exactly
/// as it was received.
pub type EpochTime = serde_json::Number;
