use std::sync::Arc;

use sensorwatch_core::bounds::{BoundsCache, BoundsProvider};
use sensorwatch_core::clock::Clock;
use sensorwatch_core::env_names::ENV_PROVIDER_URL;
use sensorwatch_events::EventPublisher;

use crate::config::{PipelineKind, WorkerConfig};
use crate::error::ConfigError;
use crate::handlers::{AbnormalPipeline, AveragePipeline, ReportPipeline};

/// External collaborators the pipelines call into.
pub struct Collaborators {
    pub publisher: Arc<dyn EventPublisher>,
    /// Required when the abnormal pipeline is enabled.
    pub bounds_provider: Option<Arc<dyn BoundsProvider>>,
    pub clock: Arc<dyn Clock>,
}

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor.
///
/// Each pipeline owns its process-wide cache; a pipeline is `Some` exactly
/// when it is enabled.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WorkerConfig>,
    pub abnormal: Option<Arc<AbnormalPipeline>>,
    pub average: Option<Arc<AveragePipeline>>,
    pub report: Option<Arc<ReportPipeline>>,
}

impl AppState {
    pub fn new(config: WorkerConfig, deps: Collaborators) -> Result<Self, ConfigError> {
        let abnormal = match &config.abnormal {
            Some(abnormal_config) => {
                let provider = deps
                    .bounds_provider
                    .clone()
                    .ok_or(ConfigError::Missing(ENV_PROVIDER_URL))?;
                let cache = Arc::new(BoundsCache::new(
                    provider,
                    Arc::clone(&deps.clock),
                    abnormal_config.stale_threshold,
                    abnormal_config.refresh_timeout,
                ));
                Some(Arc::new(AbnormalPipeline::new(
                    abnormal_config,
                    cache,
                    Arc::clone(&deps.publisher),
                )))
            }
            None => None,
        };

        let average = config.average.as_ref().map(|average_config| {
            Arc::new(AveragePipeline::new(
                average_config,
                Arc::clone(&deps.publisher),
                Arc::clone(&deps.clock),
            ))
        });

        let report = config
            .report
            .as_ref()
            .map(|report_config| Arc::new(ReportPipeline::new(report_config)));

        Ok(Self {
            config: Arc::new(config),
            abnormal,
            average,
            report,
        })
    }

    pub fn enabled_pipelines(&self) -> Vec<PipelineKind> {
        self.config.pipelines.clone()
    }
}
