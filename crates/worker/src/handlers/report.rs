//! Average report pipeline: render each published average for operators.

use chrono_tz::Tz;
use serde::Serialize;
use sensorwatch_core::accumulator::AverageEvent;
use sensorwatch_core::error::CoreError;
use sensorwatch_core::report::{self, AverageReport};
use sensorwatch_events::NotificationBatch;

use super::malformed;
use crate::config::{PipelineKind, ReportConfig};
use crate::error::{BatchError, Stage};

const PIPELINE: PipelineKind = PipelineKind::Report;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub processed: usize,
}

pub struct ReportPipeline {
    time_zone: Tz,
}

impl ReportPipeline {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            time_zone: config.time_zone,
        }
    }

    /// Render and log every average in the batch.
    ///
    /// Returns the rendered reports alongside the summary.
    pub fn process_batch(
        &self,
        batch: &NotificationBatch,
    ) -> Result<(ReportSummary, Vec<AverageReport>), BatchError> {
        let mut reports = Vec::with_capacity(batch.len());

        for (index, message) in batch.messages().enumerate() {
            let message = message
                .map_err(|e| BatchError::new(PIPELINE, Stage::Envelope, malformed(e)).at_record(index))?;

            let event: AverageEvent = serde_json::from_str(message).map_err(|e| {
                BatchError::new(
                    PIPELINE,
                    Stage::Parse,
                    CoreError::MalformedInput(format!("invalid average payload: {e}")),
                )
                .at_record(index)
            })?;

            let rendered = report::render(&event, self.time_zone).map_err(|e| {
                BatchError::new(PIPELINE, Stage::Report, e)
                    .at_record(index)
                    .for_sensor(event.sensor_id.as_str())
            })?;

            tracing::info!(
                sensor_id = %rendered.sensor_id,
                avg = rendered.value,
                date_time = %rendered.date_time,
                "{rendered}"
            );
            reports.push(rendered);
        }

        Ok((
            ReportSummary {
                processed: reports.len(),
            },
            reports,
        ))
    }
}
