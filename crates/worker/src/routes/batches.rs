//! Batch delivery endpoints.
//!
//! The body is taken as raw bytes: pub/sub HTTP deliveries are not always
//! sent as `application/json`.
//!
//! Each route is mounted only when its pipeline is enabled, with that
//! pipeline as the route's state.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::{routing::post, Json, Router};
use sensorwatch_core::error::CoreError;
use sensorwatch_events::NotificationBatch;

use crate::config::PipelineKind;
use crate::error::{AppError, AppResult, BatchError, Stage};
use crate::handlers::{
    AbnormalPipeline, AbnormalSummary, AveragePipeline, AverageSummary, ReportPipeline,
    ReportSummary,
};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();
    if let Some(pipeline) = &state.abnormal {
        router = router.merge(
            Router::new()
                .route("/abnormal", post(abnormal_batch))
                .with_state(Arc::clone(pipeline)),
        );
    }
    if let Some(pipeline) = &state.average {
        router = router.merge(
            Router::new()
                .route("/average", post(average_batch))
                .with_state(Arc::clone(pipeline)),
        );
    }
    if let Some(pipeline) = &state.report {
        router = router.merge(
            Router::new()
                .route("/average-report", post(report_batch))
                .with_state(Arc::clone(pipeline)),
        );
    }
    router
}

fn parse_batch(pipeline: PipelineKind, body: &[u8]) -> Result<NotificationBatch, BatchError> {
    NotificationBatch::from_slice(body).map_err(|e| {
        BatchError::new(pipeline, Stage::Envelope, CoreError::MalformedInput(e.to_string()))
    })
}

/// Log a failed batch and hand it back for the error response.
fn failed(err: BatchError) -> AppError {
    err.log();
    AppError::Batch(err)
}

/// POST /batches/abnormal
async fn abnormal_batch(
    State(pipeline): State<Arc<AbnormalPipeline>>,
    body: Bytes,
) -> AppResult<Json<AbnormalSummary>> {
    let batch = parse_batch(PipelineKind::Abnormal, &body).map_err(failed)?;
    tracing::debug!(records = batch.len(), "Received abnormal-values batch");

    let summary = pipeline.process_batch(&batch).await.map_err(failed)?;
    Ok(Json(summary))
}

/// POST /batches/average
async fn average_batch(
    State(pipeline): State<Arc<AveragePipeline>>,
    body: Bytes,
) -> AppResult<Json<AverageSummary>> {
    let batch = parse_batch(PipelineKind::Average, &body).map_err(failed)?;
    tracing::debug!(records = batch.len(), "Received average batch");

    let summary = pipeline.process_batch(&batch).await.map_err(failed)?;
    Ok(Json(summary))
}

/// POST /batches/average-report
async fn report_batch(
    State(pipeline): State<Arc<ReportPipeline>>,
    body: Bytes,
) -> AppResult<Json<ReportSummary>> {
    let batch = parse_batch(PipelineKind::Report, &body).map_err(failed)?;
    tracing::debug!(records = batch.len(), "Received average report batch");

    let (summary, _reports) = pipeline.process_batch(&batch).map_err(failed)?;
    Ok(Json(summary))
}
