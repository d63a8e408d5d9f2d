//! Environment variable names shared by the worker configuration and the
//! error messages that reference them.

/// Destination for readings below the sensor's minimum bound.
pub const ENV_LOW_DESTINATION: &str = "LOW_SENSOR_DATA_DESTINATION";

/// Destination for readings above the sensor's maximum bound.
pub const ENV_HIGH_DESTINATION: &str = "HIGH_SENSOR_DATA_DESTINATION";

/// Endpoint of the remote bounds provider.
pub const ENV_PROVIDER_URL: &str = "SENSOR_BOUNDS_PROVIDER_URL";

/// Maximum age, in seconds, of a cached bounds entry.
pub const ENV_STALE_TIME: &str = "STALE_TIME_SECS";

/// Upper limit, in seconds, for a single bounds refresh call.
pub const ENV_REFRESH_TIMEOUT: &str = "BOUNDS_REFRESH_TIMEOUT_SECS";

/// Destination for completed window averages.
pub const ENV_AVG_DESTINATION: &str = "AVG_SENSOR_VALUES_DESTINATION";

/// Number of samples per averaging window.
pub const ENV_REDUCING_SIZE: &str = "REDUCING_SIZE";

/// IANA time zone (e.g. `Asia/Jerusalem`) used when rendering average reports.
pub const ENV_REPORT_TZ: &str = "REPORT_TZ";
