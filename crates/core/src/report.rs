//! Human-readable rendering of completed window averages.
//!
//! Consumers of the average destination log one report per event with the
//! sensor id, the mean, and the emission time in a configured time zone.

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::accumulator::AverageEvent;
use crate::error::CoreError;
use crate::types::{EpochTime, SensorId};

const DATE_TIME_FORMAT: &str = "%A, %-d %B %Y at %H:%M:%S %Z";

#[derive(Debug, Clone, PartialEq)]
pub struct AverageReport {
    pub sensor_id: SensorId,
    pub value: f64,
    pub date_time: String,
}

impl fmt::Display for AverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sensorId = {}\navg value = {}\ndate-time = {}",
            self.sensor_id, self.value, self.date_time
        )
    }
}

/// Render `event` with its millisecond timestamp shown in `time_zone`.
pub fn render(event: &AverageEvent, time_zone: Tz) -> Result<AverageReport, CoreError> {
    let utc = epoch_millis(&event.timestamp)
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| {
            CoreError::MalformedInput(format!(
                "average timestamp {} is out of range",
                event.timestamp
            ))
        })?;

    Ok(AverageReport {
        sensor_id: event.sensor_id.clone(),
        value: event.value,
        date_time: utc.with_timezone(&time_zone).format(DATE_TIME_FORMAT).to_string(),
    })
}

/// Whole epoch milliseconds; fractional milliseconds are truncated.
fn epoch_millis(timestamp: &EpochTime) -> Option<i64> {
    if let Some(millis) = timestamp.as_i64() {
        return Some(millis);
    }
    let millis = timestamp.as_f64()?.trunc();
    if millis >= i64::MIN as f64 && millis < i64::MAX as f64 {
        Some(millis as i64)
    } else {
        None
    }
}
