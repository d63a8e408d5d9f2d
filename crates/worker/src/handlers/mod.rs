//! Batch handlers, one per pipeline.
//!
//! Every handler walks the batch strictly in delivery order and stops at
//! the first failing record. Cache state already mutated by earlier
//! records in the batch is kept; the transport redelivers the whole batch.

pub mod abnormal;
pub mod average;
pub mod report;

pub use abnormal::{AbnormalPipeline, AbnormalSummary};
pub use average::{AveragePipeline, AverageSummary};
pub use report::{ReportPipeline, ReportSummary};

use sensorwatch_core::error::CoreError;
use sensorwatch_events::{EnvelopeError, PublishError};

fn malformed(err: EnvelopeError) -> CoreError {
    CoreError::MalformedInput(err.to_string())
}

fn publish_failed(err: PublishError) -> CoreError {
    CoreError::Publish(err.to_string())
}
