//! Window-then-reset averaging.
//!
//! Each sensor has a buffer of pending values. When the buffer reaches the
//! window size the mean of the whole buffer is emitted and the buffer is
//! cleared, so the next window starts from zero samples. This is not a
//! sliding window.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::types::{EpochTime, SensorId, Timestamp};

/// A completed window average.
///
/// `timestamp` is the emission time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageEvent {
    pub sensor_id: SensorId,
    pub value: f64,
    pub timestamp: EpochTime,
}

impl AverageEvent {
    pub fn new(sensor_id: impl Into<SensorId>, mean: f64, emitted_at: Timestamp) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            value: mean,
            timestamp: EpochTime::from(emitted_at.timestamp_millis()),
        }
    }
}

/// Per-sensor accumulation buffers shared across concurrent batches.
///
/// Accumulation never awaits, so a plain mutex around the whole map is
/// enough to serialise mutations per sensor.
#[derive(Debug, Default)]
pub struct AverageAccumulator {
    buffers: Mutex<HashMap<SensorId, Vec<f64>>>,
}

impl AverageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the sensor's buffer and emit the mean once the
    /// buffer holds `window_size` values.
    ///
    /// Returns `None` while the window is still filling. A `window_size` of
    /// zero behaves like one, emitting on every call.
    pub fn accumulate(&self, sensor_id: &str, value: f64, window_size: usize) -> Option<f64> {
        let window_size = window_size.max(1);
        let mut buffers = self.buffers.lock().unwrap_or_else(|p| p.into_inner());

        let buffer = buffers.entry(sensor_id.to_string()).or_default();
        buffer.push(value);

        if buffer.len() < window_size {
            tracing::debug!(sensor_id, pending = buffer.len(), window_size, "Buffered value");
            return None;
        }

        let mean = mean(buffer);
        buffers.remove(sensor_id);

        tracing::debug!(sensor_id, mean, window_size, "Window complete");
        Some(mean)
    }

    /// Number of values currently buffered for `sensor_id`.
    pub fn pending(&self, sensor_id: &str) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(sensor_id)
            .map_or(0, Vec::len)
    }
}

/// Arithmetic mean of finite values that stays finite when the plain sum
/// would overflow.
fn mean(values: &[f64]) -> f64 {
    let len = values.len() as f64;
    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        sum / len
    } else {
        values.iter().map(|v| v / len).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
