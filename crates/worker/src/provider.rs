//! HTTP client for the remote bounds provider.
//!
//! The provider is called with `{"sensorId": "<id>"}` and answers with
//! `{"sensorId": "<id>", "values": [min, max]}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sensorwatch_core::bounds::{BoundsProvider, ProvidedBounds};
use sensorwatch_core::error::ProviderError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BoundsRequest<'a> {
    sensor_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundsResponse {
    #[serde(default)]
    sensor_id: Option<String>,
    #[serde(default)]
    values: Option<Vec<serde_json::Value>>,
}

/// Bounds provider reached over HTTP with a single reusable client.
pub struct HttpBoundsProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpBoundsProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl BoundsProvider for HttpBoundsProvider {
    async fn fetch_bounds(&self, sensor_id: &str) -> Result<ProvidedBounds, ProviderError> {
        let request_failed = |message: String| ProviderError::Request {
            sensor_id: sensor_id.to_string(),
            message,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&BoundsRequest { sensor_id })
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(request_failed(format!("provider returned HTTP {}", status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        parse_bounds_response(sensor_id, &body)
    }
}

/// Extract `[min, max]` from a provider response body.
///
/// The first two entries of `values` must be numbers. A `sensorId` in the
/// response, when present, must match the requested sensor.
pub fn parse_bounds_response(sensor_id: &str, body: &[u8]) -> Result<ProvidedBounds, ProviderError> {
    let invalid = |message: String| ProviderError::InvalidPayload {
        sensor_id: sensor_id.to_string(),
        message,
    };

    let response: BoundsResponse =
        serde_json::from_slice(body).map_err(|e| invalid(format!("not a bounds object: {e}")))?;

    if let Some(returned) = response.sensor_id.as_deref() {
        if returned != sensor_id {
            return Err(invalid(format!("response is for sensor '{returned}'")));
        }
    }

    let values = response
        .values
        .ok_or_else(|| invalid("missing 'values'".to_string()))?;

    match values.as_slice() {
        [min, max, ..] => {
            let min = min
                .as_f64()
                .ok_or_else(|| invalid(format!("min bound {min} is not a number")))?;
            let max = max
                .as_f64()
                .ok_or_else(|| invalid(format!("max bound {max} is not a number")))?;
            Ok(ProvidedBounds { min, max })
        }
        _ => Err(invalid(format!(
            "expected [min, max], got {} value(s)",
            values.len()
        ))),
    }
}
