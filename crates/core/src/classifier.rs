//! Low/high classification of readings against cached bounds.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bounds::{BoundsCache, SensorBounds};
use crate::error::ProviderError;
use crate::reading::Reading;
use crate::types::{EpochTime, SensorId};

/// Which side of the range a reading fell out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
    /// Strictly below the minimum bound.
    Low,
    /// Strictly above the maximum bound.
    High,
}

impl BoundKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundKind::Low => "low",
            BoundKind::High => "high",
        }
    }
}

/// An out-of-bounds reading, tagged with the bound it crossed.
///
/// On the wire this is `{sensorId, value, minValue, timestamp}` for low
/// events and `{sensorId, value, maxValue, timestamp}` for high events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ClassifiedPayload", try_from = "ClassifiedPayload")]
pub struct ClassifiedEvent {
    pub sensor_id: SensorId,
    pub value: f64,
    pub kind: BoundKind,
    /// The crossed bound: `min` for low events, `max` for high events.
    pub bound: f64,
    pub timestamp: EpochTime,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifiedPayload {
    sensor_id: SensorId,
    value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_value: Option<f64>,
    timestamp: EpochTime,
}

impl From<ClassifiedEvent> for ClassifiedPayload {
    fn from(event: ClassifiedEvent) -> Self {
        let (min_value, max_value) = match event.kind {
            BoundKind::Low => (Some(event.bound), None),
            BoundKind::High => (None, Some(event.bound)),
        };
        Self {
            sensor_id: event.sensor_id,
            value: event.value,
            min_value,
            max_value,
            timestamp: event.timestamp,
        }
    }
}

impl TryFrom<ClassifiedPayload> for ClassifiedEvent {
    type Error = String;

    fn try_from(payload: ClassifiedPayload) -> Result<Self, Self::Error> {
        let (kind, bound) = match (payload.min_value, payload.max_value) {
            (Some(min), None) => (BoundKind::Low, min),
            (None, Some(max)) => (BoundKind::High, max),
            _ => {
                return Err("classified event needs exactly one of minValue or maxValue".into());
            }
        };
        Ok(Self {
            sensor_id: payload.sensor_id,
            value: payload.value,
            kind,
            bound,
            timestamp: payload.timestamp,
        })
    }
}

/// Classify `reading` against already-resolved bounds.
///
/// Only strict inequalities are abnormal; a value equal to either bound is
/// within range and yields `None`.
pub fn classify_against(reading: &Reading, bounds: &SensorBounds) -> Option<ClassifiedEvent> {
    let (kind, bound) = if reading.value < bounds.min {
        (BoundKind::Low, bounds.min)
    } else if reading.value > bounds.max {
        (BoundKind::High, bounds.max)
    } else {
        return None;
    };

    Some(ClassifiedEvent {
        sensor_id: reading.sensor_id.clone(),
        value: reading.value,
        kind,
        bound,
        timestamp: reading.timestamp.clone(),
    })
}

/// Classifies readings, refreshing bounds through the shared cache as needed.
pub struct BoundsClassifier {
    cache: Arc<BoundsCache>,
}

impl BoundsClassifier {
    pub fn new(cache: Arc<BoundsCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &BoundsCache {
        &self.cache
    }

    /// Classify one reading.
    ///
    /// May trigger a provider refresh. If that refresh fails the whole
    /// classification fails and nothing is cached for the sensor.
    pub async fn classify(&self, reading: &Reading) -> Result<Option<ClassifiedEvent>, ProviderError> {
        let bounds = self.cache.get(&reading.sensor_id).await?;

        tracing::debug!(
            sensor_id = %reading.sensor_id,
            value = reading.value,
            min = bounds.min,
            max = bounds.max,
            "Classifying reading"
        );

        Ok(classify_against(reading, &bounds))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
