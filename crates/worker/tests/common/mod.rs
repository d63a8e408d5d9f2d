#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use sensorwatch_core::bounds::{BoundsProvider, ProvidedBounds};
use sensorwatch_core::clock::ManualClock;
use sensorwatch_core::error::ProviderError;
use sensorwatch_events::{EventPublisher, PublishError};
use serde_json::{json, Value};
use tower::ServiceExt;

use sensorwatch_worker::config::WorkerConfig;
use sensorwatch_worker::router::build_app_router;
use sensorwatch_worker::state::{AppState, Collaborators};

pub const LOW_DESTINATION: &str = "low-sensor-data";
pub const HIGH_DESTINATION: &str = "high-sensor-data";
pub const AVG_DESTINATION: &str = "avg-sensor-values";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Environment used by every test unless overridden.
pub fn test_env() -> HashMap<String, String> {
    [
        ("HOST", "127.0.0.1"),
        ("PORT", "0"),
        ("LOW_SENSOR_DATA_DESTINATION", LOW_DESTINATION),
        ("HIGH_SENSOR_DATA_DESTINATION", HIGH_DESTINATION),
        ("SENSOR_BOUNDS_PROVIDER_URL", "http://bounds.test/lookup"),
        ("STALE_TIME_SECS", "60"),
        ("AVG_SENSOR_VALUES_DESTINATION", AVG_DESTINATION),
        ("REDUCING_SIZE", "3"),
        ("REPORT_TZ", "UTC"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn test_config(overrides: &[(&str, &str)]) -> WorkerConfig {
    let mut env = test_env();
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }
    WorkerConfig::from_lookup(|name| env.get(name).cloned()).expect("test config is valid")
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Publisher that records every payload instead of sending it.
#[derive(Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<(String, Value)>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, destination: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|(d, _)| d == destination)
            .map(|(_, payload)| payload)
            .collect()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, destination: &str, payload: &Value) -> Result<(), PublishError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublishError::HttpStatus {
                destination: destination.to_string(),
                status: 503,
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), payload.clone()));
        Ok(())
    }
}

/// Bounds provider answering from a fixed table.
#[derive(Default)]
pub struct StaticProvider {
    bounds: Mutex<HashMap<String, ProvidedBounds>>,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl StaticProvider {
    pub fn serve(&self, sensor_id: &str, min: f64, max: f64) {
        self.bounds
            .lock()
            .unwrap()
            .insert(sensor_id.to_string(), ProvidedBounds { min, max });
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BoundsProvider for StaticProvider {
    async fn fetch_bounds(&self, sensor_id: &str) -> Result<ProvidedBounds, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Request {
                sensor_id: sensor_id.to_string(),
                message: "provider unavailable".into(),
            });
        }
        self.bounds
            .lock()
            .unwrap()
            .get(sensor_id)
            .copied()
            .ok_or_else(|| ProviderError::InvalidPayload {
                sensor_id: sensor_id.to_string(),
                message: "unknown sensor".into(),
            })
    }
}

// ---------------------------------------------------------------------------
// Test app
// ---------------------------------------------------------------------------

/// The full application plus handles on its collaborators.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub publisher: Arc<RecordingPublisher>,
    pub provider: Arc<StaticProvider>,
    pub clock: Arc<ManualClock>,
}

/// Build the application the way `main.rs` does, with fakes for the
/// provider and publisher and a clock fixed at 2024-03-01T12:00:00Z.
pub fn build_test_app(config: WorkerConfig) -> TestApp {
    let publisher = Arc::new(RecordingPublisher::default());
    let provider = Arc::new(StaticProvider::default());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ));

    let state = AppState::new(
        config,
        Collaborators {
            publisher: publisher.clone(),
            bounds_provider: Some(provider.clone()),
            clock: clock.clone(),
        },
    )
    .expect("state builds");

    TestApp {
        app: build_app_router(state.clone()),
        state,
        publisher,
        provider,
        clock,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Wrap each message (serialized to a string) in a pub/sub envelope.
pub fn envelope(messages: &[Value]) -> Value {
    let records: Vec<Value> = messages
        .iter()
        .map(|m| json!({ "Sns": { "Message": m.to_string() } }))
        .collect();
    json!({ "Records": records })
}

pub fn reading(sensor_id: &str, value: f64, timestamp: i64) -> Value {
    json!({ "sensorId": sensor_id, "value": value, "timestamp": timestamp })
}

/// POST a raw body as `text/plain`, the way the transport delivers it.
pub async fn post_raw(app: &Router, uri: &str, body: impl Into<Body>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "text/plain; charset=UTF-8")
        .body(body.into())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_batch(app: &Router, uri: &str, messages: &[Value]) -> Response<Body> {
    post_raw(app, uri, envelope(messages).to_string()).await
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
