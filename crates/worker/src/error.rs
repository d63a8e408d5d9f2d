use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sensorwatch_core::error::CoreError;
use sensorwatch_core::types::SensorId;

use crate::config::PipelineKind;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Startup configuration failure. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        CoreError::Configuration(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// BatchError
// ---------------------------------------------------------------------------

/// The step of batch processing at which a record failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Envelope,
    Parse,
    Classify,
    Publish,
    Report,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Envelope => "envelope",
            Stage::Parse => "parse",
            Stage::Classify => "classify",
            Stage::Publish => "publish",
            Stage::Report => "report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch aborted at its first failing record.
#[derive(Debug, thiserror::Error)]
#[error("{pipeline} batch failed at {stage} stage: {source}")]
pub struct BatchError {
    pub pipeline: PipelineKind,
    pub stage: Stage,
    /// Position of the failing record, if the failure is tied to one.
    pub record_index: Option<usize>,
    pub sensor_id: Option<SensorId>,
    #[source]
    pub source: CoreError,
}

impl BatchError {
    pub fn new(pipeline: PipelineKind, stage: Stage, source: impl Into<CoreError>) -> Self {
        Self {
            pipeline,
            stage,
            record_index: None,
            sensor_id: None,
            source: source.into(),
        }
    }

    pub fn at_record(mut self, index: usize) -> Self {
        self.record_index = Some(index);
        self
    }

    pub fn for_sensor(mut self, sensor_id: impl Into<SensorId>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }

    /// Log the failure with enough context to diagnose it.
    pub fn log(&self) {
        tracing::error!(
            pipeline = %self.pipeline,
            stage = %self.stage,
            record_index = ?self.record_index,
            sensor_id = ?self.sensor_id,
            error = %self.source,
            "Batch failed"
        );
    }
}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// HTTP-facing error for batch endpoints.
///
/// Any non-2xx response makes the transport redeliver the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Batch(#[from] BatchError),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Batch(err) = self;

        let (status, code) = match &err.source {
            CoreError::MalformedInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_INPUT"),
            CoreError::Provider(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
            CoreError::Publish(_) => (StatusCode::BAD_GATEWAY, "PUBLISH_ERROR"),
            CoreError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
            }
        };

        let body = json!({
            "error": err.source.to_string(),
            "code": code,
            "pipeline": err.pipeline.as_str(),
            "stage": err.stage.as_str(),
            "record_index": err.record_index,
            "sensor_id": err.sensor_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
