//! Worker configuration loaded from environment variables.
//!
//! Everything is read and validated once at startup, before the server
//! binds. A missing destination or provider identifier for an enabled
//! pipeline is fatal, as is any unparsable or non-positive numeric value.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use sensorwatch_core::env_names::{
    ENV_AVG_DESTINATION, ENV_HIGH_DESTINATION, ENV_LOW_DESTINATION, ENV_PROVIDER_URL,
    ENV_REDUCING_SIZE, ENV_REFRESH_TIMEOUT, ENV_REPORT_TZ, ENV_STALE_TIME,
};

use crate::error::ConfigError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PUBLISH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PIPELINES: &str = "abnormal,average,report";
/// Large enough that cached bounds effectively never go stale.
const DEFAULT_STALE_TIME_SECS: u64 = 1_000_000_000;
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REDUCING_SIZE: u64 = 5;
const DEFAULT_REPORT_TZ: &str = "Asia/Jerusalem";

// ---------------------------------------------------------------------------
// Enumerated settings
// ---------------------------------------------------------------------------

/// The batch pipelines a worker process can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Classify readings against cached bounds.
    Abnormal,
    /// Accumulate readings into window averages.
    Average,
    /// Render completed averages as reports.
    Report,
}

impl PipelineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineKind::Abnormal => "abnormal",
            PipelineKind::Average => "average",
            PipelineKind::Report => "report",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abnormal" => Ok(PipelineKind::Abnormal),
            "average" => Ok(PipelineKind::Average),
            "report" => Ok(PipelineKind::Report),
            other => Err(format!("unknown pipeline '{other}'")),
        }
    }
}

/// Where derived events are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// POST each payload to its destination URL.
    #[default]
    Http,
    /// Publish onto the in-process bus and log it.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Upper bound on handling one batch request, in seconds.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AbnormalConfig {
    pub low_destination: String,
    pub high_destination: String,
    pub provider_url: String,
    pub stale_threshold: Duration,
    pub refresh_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AverageConfig {
    pub destination: String,
    /// Always at least 1.
    pub window_size: usize,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub time_zone: Tz,
}

/// Complete worker configuration.
///
/// Per-pipeline sections are `Some` exactly when the pipeline is enabled.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub server: ServerConfig,
    pub pipelines: Vec<PipelineKind>,
    pub publish_mode: PublishMode,
    pub publish_timeout: Duration,
    pub log_format: LogFormat,
    pub abnormal: Option<AbnormalConfig>,
    pub average: Option<AverageConfig>,
    pub report: Option<ReportConfig>,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                          | Required when     | Default                   |
    /// |----------------------------------|-------------------|---------------------------|
    /// | `HOST`                           |                   | `0.0.0.0`                 |
    /// | `PORT`                           |                   | `3000`                    |
    /// | `REQUEST_TIMEOUT_SECS`           |                   | `30`                      |
    /// | `WORKER_PIPELINES`               |                   | `abnormal,average,report` |
    /// | `PUBLISH_MODE`                   |                   | `http`                    |
    /// | `PUBLISH_TIMEOUT_SECS`           |                   | `10`                      |
    /// | `LOG_FORMAT`                     |                   | `text`                    |
    /// | `LOW_SENSOR_DATA_DESTINATION`    | abnormal          |                           |
    /// | `HIGH_SENSOR_DATA_DESTINATION`   | abnormal          |                           |
    /// | `SENSOR_BOUNDS_PROVIDER_URL`     | abnormal          |                           |
    /// | `STALE_TIME_SECS`                |                   | `1000000000`              |
    /// | `BOUNDS_REFRESH_TIMEOUT_SECS`    |                   | `10`                      |
    /// | `AVG_SENSOR_VALUES_DESTINATION`  | average           |                           |
    /// | `REDUCING_SIZE`                  |                   | `5`                       |
    /// | `REPORT_TZ`                      |                   | `Asia/Jerusalem`          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let server = ServerConfig {
            host: env.get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env.parse("PORT", DEFAULT_PORT)?,
            request_timeout_secs: env.positive("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
        };

        let pipelines = parse_pipelines(
            &env.get("WORKER_PIPELINES")
                .unwrap_or_else(|| DEFAULT_PIPELINES.to_string()),
        )?;

        let publish_mode = match env.get("PUBLISH_MODE").as_deref().map(str::to_ascii_lowercase) {
            None => PublishMode::default(),
            Some(mode) if mode == "http" => PublishMode::Http,
            Some(mode) if mode == "local" => PublishMode::Local,
            Some(mode) => {
                return Err(ConfigError::Invalid {
                    var: "PUBLISH_MODE",
                    value: mode,
                    reason: "expected 'http' or 'local'".into(),
                })
            }
        };

        let log_format = match env.get("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase) {
            None => LogFormat::default(),
            Some(format) if format == "text" => LogFormat::Text,
            Some(format) if format == "json" => LogFormat::Json,
            Some(format) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: format,
                    reason: "expected 'text' or 'json'".into(),
                })
            }
        };

        let publish_timeout =
            Duration::from_secs(env.positive("PUBLISH_TIMEOUT_SECS", DEFAULT_PUBLISH_TIMEOUT_SECS)?);

        let abnormal = if pipelines.contains(&PipelineKind::Abnormal) {
            Some(AbnormalConfig {
                low_destination: env.require(ENV_LOW_DESTINATION)?,
                high_destination: env.require(ENV_HIGH_DESTINATION)?,
                provider_url: env.require(ENV_PROVIDER_URL)?,
                stale_threshold: Duration::from_secs(
                    env.parse(ENV_STALE_TIME, DEFAULT_STALE_TIME_SECS)?,
                ),
                refresh_timeout: Duration::from_secs(
                    env.positive(ENV_REFRESH_TIMEOUT, DEFAULT_REFRESH_TIMEOUT_SECS)?,
                ),
            })
        } else {
            None
        };

        let average = if pipelines.contains(&PipelineKind::Average) {
            let window_size = env.positive(ENV_REDUCING_SIZE, DEFAULT_REDUCING_SIZE)?;
            Some(AverageConfig {
                destination: env.require(ENV_AVG_DESTINATION)?,
                window_size: usize::try_from(window_size).map_err(|_| ConfigError::Invalid {
                    var: ENV_REDUCING_SIZE,
                    value: window_size.to_string(),
                    reason: "window size is too large".into(),
                })?,
            })
        } else {
            None
        };

        let report = if pipelines.contains(&PipelineKind::Report) {
            let raw = env
                .get(ENV_REPORT_TZ)
                .unwrap_or_else(|| DEFAULT_REPORT_TZ.to_string());
            let time_zone = raw.trim().parse::<Tz>().map_err(|e| ConfigError::Invalid {
                var: ENV_REPORT_TZ,
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            Some(ReportConfig { time_zone })
        } else {
            None
        };

        Ok(Self {
            server,
            pipelines,
            publish_mode,
            publish_timeout,
            log_format,
            abnormal,
            average,
            report,
        })
    }

    pub fn is_enabled(&self, pipeline: PipelineKind) -> bool {
        self.pipelines.contains(&pipeline)
    }
}

fn parse_pipelines(raw: &str) -> Result<Vec<PipelineKind>, ConfigError> {
    let mut pipelines = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind: PipelineKind = name.parse().map_err(|reason| ConfigError::Invalid {
            var: "WORKER_PIPELINES",
            value: raw.to_string(),
            reason,
        })?;
        if !pipelines.contains(&kind) {
            pipelines.push(kind);
        }
    }

    if pipelines.is_empty() {
        return Err(ConfigError::Invalid {
            var: "WORKER_PIPELINES",
            value: raw.to_string(),
            reason: "at least one pipeline must be enabled".into(),
        });
    }
    Ok(pipelines)
}

/// Variable lookup with the parsing rules shared by every setting.
struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: name,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn positive(&self, name: &'static str, default: u64) -> Result<u64, ConfigError> {
        // Parsed as signed so negative input gets a precise message.
        let value: i64 = self.parse(name, default as i64)?;
        if value <= 0 {
            return Err(ConfigError::Invalid {
                var: name,
                value: value.to_string(),
                reason: "must be a positive integer".into(),
            });
        }
        Ok(value as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
