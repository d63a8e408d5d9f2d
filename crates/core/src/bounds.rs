//! Per-sensor bounds cache with read-through refresh.
//!
//! [`BoundsCache`] maps a sensor id to the `[min, max]` range last fetched
//! from the external [`BoundsProvider`], together with the time of that
//! fetch. [`BoundsCache::get`] refreshes on a miss or when the entry is
//! older than the staleness threshold; otherwise the cached entry is
//! returned untouched.
//!
//! Locking: the entry map sits behind an async `RwLock` that is never held
//! across the provider call. Each sensor additionally has its own refresh
//! mutex, so concurrent lookups for one sensor share a single provider
//! round-trip while unrelated sensors refresh in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::error::ProviderError;
use crate::types::{SensorId, Timestamp};

/// Bounds as returned by the provider, before the cache stamps them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProvidedBounds {
    pub min: f64,
    pub max: f64,
}

/// A cached bounds entry.
///
/// `fetched_at` is always the time of the last successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorBounds {
    pub sensor_id: SensorId,
    pub min: f64,
    pub max: f64,
    pub fetched_at: Timestamp,
}

/// Remote source of truth for sensor bounds.
#[async_trait]
pub trait BoundsProvider: Send + Sync {
    /// Fetch the current bounds for `sensor_id`. Only the id is sent.
    async fn fetch_bounds(&self, sensor_id: &str) -> Result<ProvidedBounds, ProviderError>;
}

/// Whether an entry must be refreshed before use.
///
/// True when there is no entry, or when `now - fetched_at` is strictly
/// greater than `stale_threshold`.
pub fn needs_refresh(
    entry: Option<&SensorBounds>,
    stale_threshold: Duration,
    now: Timestamp,
) -> bool {
    let Some(entry) = entry else {
        return true;
    };

    let age = now.signed_duration_since(entry.fetched_at);
    // A threshold too large for chrono to represent never expires.
    chrono::Duration::from_std(stale_threshold).is_ok_and(|limit| age > limit)
}

pub struct BoundsCache {
    provider: Arc<dyn BoundsProvider>,
    clock: Arc<dyn Clock>,
    stale_threshold: Duration,
    refresh_timeout: Duration,
    entries: RwLock<HashMap<SensorId, SensorBounds>>,
    refresh_locks: Mutex<HashMap<SensorId, Arc<tokio::sync::Mutex<()>>>>,
}

impl BoundsCache {
    pub fn new(
        provider: Arc<dyn BoundsProvider>,
        clock: Arc<dyn Clock>,
        stale_threshold: Duration,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            clock,
            stale_threshold,
            refresh_timeout,
            entries: RwLock::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn stale_threshold(&self) -> Duration {
        self.stale_threshold
    }

    /// [`needs_refresh`] against the current cache contents and clock.
    pub async fn needs_refresh(&self, sensor_id: &str) -> bool {
        let entries = self.entries.read().await;
        needs_refresh(entries.get(sensor_id), self.stale_threshold, self.clock.now())
    }

    /// Return the bounds for `sensor_id`, refreshing first if missing or stale.
    pub async fn get(&self, sensor_id: &str) -> Result<SensorBounds, ProviderError> {
        if let Some(bounds) = self.fresh_entry(sensor_id).await {
            tracing::debug!(sensor_id, "Bounds cache hit");
            return Ok(bounds);
        }

        let lock = self.refresh_lock(sensor_id);
        let _guard = lock.lock().await;

        // Another task may have refreshed this sensor while we waited.
        if let Some(bounds) = self.fresh_entry(sensor_id).await {
            tracing::debug!(sensor_id, "Bounds refreshed by a concurrent lookup");
            return Ok(bounds);
        }

        self.refresh(sensor_id).await
    }

    /// Fetch bounds from the provider and overwrite the cached entry.
    ///
    /// On failure the cache is left exactly as it was.
    pub async fn refresh(&self, sensor_id: &str) -> Result<SensorBounds, ProviderError> {
        tracing::debug!(sensor_id, "Refreshing sensor bounds");

        let provided = tokio::time::timeout(
            self.refresh_timeout,
            self.provider.fetch_bounds(sensor_id),
        )
        .await
        .map_err(|_| ProviderError::Timeout {
            sensor_id: sensor_id.to_string(),
            timeout_secs: self.refresh_timeout.as_secs(),
        })??;

        if !provided.min.is_finite() || !provided.max.is_finite() {
            return Err(ProviderError::InvalidPayload {
                sensor_id: sensor_id.to_string(),
                message: format!(
                    "bounds must be finite numbers, got min={} max={}",
                    provided.min, provided.max
                ),
            });
        }

        let bounds = SensorBounds {
            sensor_id: sensor_id.to_string(),
            min: provided.min,
            max: provided.max,
            fetched_at: self.clock.now(),
        };

        self.entries
            .write()
            .await
            .insert(sensor_id.to_string(), bounds.clone());

        tracing::debug!(
            sensor_id,
            min = bounds.min,
            max = bounds.max,
            "Sensor bounds cached"
        );

        Ok(bounds)
    }

    /// The cached entry, fresh or not, without triggering a refresh.
    pub async fn peek(&self, sensor_id: &str) -> Option<SensorBounds> {
        self.entries.read().await.get(sensor_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn fresh_entry(&self, sensor_id: &str) -> Option<SensorBounds> {
        let entries = self.entries.read().await;
        let entry = entries.get(sensor_id);
        if needs_refresh(entry, self.stale_threshold, self.clock.now()) {
            None
        } else {
            entry.cloned()
        }
    }

    fn refresh_lock(&self, sensor_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.refresh_locks.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(locks.entry(sensor_id.to_string()).or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
