//! Average pipeline: buffer readings per sensor and publish the mean of
//! every completed window.

use std::sync::Arc;

use serde::Serialize;
use sensorwatch_core::accumulator::{AverageAccumulator, AverageEvent};
use sensorwatch_core::clock::Clock;
use sensorwatch_core::reading::Reading;
use sensorwatch_events::{publish_event, EventPublisher, NotificationBatch};

use super::{malformed, publish_failed};
use crate::config::{AverageConfig, PipelineKind};
use crate::error::{BatchError, Stage};

const PIPELINE: PipelineKind = PipelineKind::Average;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AverageSummary {
    pub processed: usize,
    pub emitted: usize,
}

pub struct AveragePipeline {
    accumulator: AverageAccumulator,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    destination: String,
    window_size: usize,
}

impl AveragePipeline {
    pub fn new(
        config: &AverageConfig,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accumulator: AverageAccumulator::new(),
            publisher,
            clock,
            destination: config.destination.clone(),
            window_size: config.window_size,
        }
    }

    pub fn accumulator(&self) -> &AverageAccumulator {
        &self.accumulator
    }

    pub async fn process_batch(
        &self,
        batch: &NotificationBatch,
    ) -> Result<AverageSummary, BatchError> {
        let mut summary = AverageSummary::default();

        for (index, message) in batch.messages().enumerate() {
            let message = message
                .map_err(|e| BatchError::new(PIPELINE, Stage::Envelope, malformed(e)).at_record(index))?;

            let reading = Reading::from_json(message)
                .map_err(|e| BatchError::new(PIPELINE, Stage::Parse, e).at_record(index))?;

            let mean = self
                .accumulator
                .accumulate(&reading.sensor_id, reading.value, self.window_size);
            summary.processed += 1;

            let Some(mean) = mean else {
                continue;
            };

            // The buffer is already reset; a failed publish does not restore it.
            let event = AverageEvent::new(reading.sensor_id, mean, self.clock.now());
            publish_event(self.publisher.as_ref(), &self.destination, &event)
                .await
                .map_err(|e| {
                    BatchError::new(PIPELINE, Stage::Publish, publish_failed(e))
                        .at_record(index)
                        .for_sensor(event.sensor_id.as_str())
                })?;

            tracing::info!(sensor_id = %event.sensor_id, avg = event.value, "Average published");
            summary.emitted += 1;
        }

        Ok(summary)
    }
}
