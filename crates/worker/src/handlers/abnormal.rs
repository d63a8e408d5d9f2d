//! Abnormal-values pipeline: classify each reading and publish low/high
//! events to their destinations.

use std::sync::Arc;

use serde::Serialize;
use sensorwatch_core::bounds::BoundsCache;
use sensorwatch_core::classifier::{BoundKind, BoundsClassifier};
use sensorwatch_core::reading::Reading;
use sensorwatch_events::{publish_event, EventPublisher, NotificationBatch};

use super::{malformed, publish_failed};
use crate::config::{AbnormalConfig, PipelineKind};
use crate::error::{BatchError, Stage};

const PIPELINE: PipelineKind = PipelineKind::Abnormal;

/// Outcome of a successfully processed abnormal-values batch.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AbnormalSummary {
    pub processed: usize,
    pub low: usize,
    pub high: usize,
}

pub struct AbnormalPipeline {
    classifier: BoundsClassifier,
    publisher: Arc<dyn EventPublisher>,
    low_destination: String,
    high_destination: String,
}

impl AbnormalPipeline {
    pub fn new(
        config: &AbnormalConfig,
        cache: Arc<BoundsCache>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            classifier: BoundsClassifier::new(cache),
            publisher,
            low_destination: config.low_destination.clone(),
            high_destination: config.high_destination.clone(),
        }
    }

    pub fn cache(&self) -> &BoundsCache {
        self.classifier.cache()
    }

    pub async fn process_batch(
        &self,
        batch: &NotificationBatch,
    ) -> Result<AbnormalSummary, BatchError> {
        let mut summary = AbnormalSummary::default();

        for (index, message) in batch.messages().enumerate() {
            let message = message
                .map_err(|e| BatchError::new(PIPELINE, Stage::Envelope, malformed(e)).at_record(index))?;

            let reading = Reading::from_json(message)
                .map_err(|e| BatchError::new(PIPELINE, Stage::Parse, e).at_record(index))?;

            let classified = self.classifier.classify(&reading).await.map_err(|e| {
                BatchError::new(PIPELINE, Stage::Classify, e)
                    .at_record(index)
                    .for_sensor(reading.sensor_id.as_str())
            })?;
            summary.processed += 1;

            let Some(event) = classified else {
                continue;
            };

            let destination = match event.kind {
                BoundKind::Low => &self.low_destination,
                BoundKind::High => &self.high_destination,
            };

            publish_event(self.publisher.as_ref(), destination, &event)
                .await
                .map_err(|e| {
                    BatchError::new(PIPELINE, Stage::Publish, publish_failed(e))
                        .at_record(index)
                        .for_sensor(event.sensor_id.as_str())
                })?;

            tracing::info!(
                sensor_id = %event.sensor_id,
                value = event.value,
                bound = event.bound,
                kind = event.kind.as_str(),
                "Abnormal reading published"
            );

            match event.kind {
                BoundKind::Low => summary.low += 1,
                BoundKind::High => summary.high += 1,
            }
        }

        Ok(summary)
    }
}
