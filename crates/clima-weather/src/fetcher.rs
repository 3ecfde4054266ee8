//! Cached forecast fetching.
//!
//! A fetch cycle reads the cache, returns a fresh entry without touching the
//! network, and otherwise asks the provider. When the provider fails, any
//! cached entry (however old) is returned alongside the error.

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{cache_key, CacheEntry, ForecastCache};
use crate::error::WeatherError;
use crate::provider::{ForecastProvider, ProviderConfig};
use crate::store::KeyValueStore;
use crate::types::{Coordinate, ForecastSnapshot};

pub const DEFAULT_CACHE_TTL_MINUTES: i64 = 10;

/// Where the data in a [`FetchOutcome`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Network,
    Cache,
    StaleCache,
    None,
}

/// Result of one fetch cycle.
///
/// `snapshot` and `error` may both be set: stale cached data served because
/// the provider failed.
#[derive(Debug)]
pub struct FetchOutcome {
    pub snapshot: Option<ForecastSnapshot>,
    pub source: DataSource,
    pub error: Option<WeatherError>,
}

impl FetchOutcome {
    fn fresh(snapshot: ForecastSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            source: DataSource::Network,
            error: None,
        }
    }

    fn cached(entry: CacheEntry) -> Self {
        Self {
            snapshot: Some(entry.data),
            source: DataSource::Cache,
            error: None,
        }
    }

    fn failed(error: WeatherError, fallback: Option<CacheEntry>) -> Self {
        match fallback {
            Some(entry) => Self {
                snapshot: Some(entry.data),
                source: DataSource::StaleCache,
                error: Some(error),
            },
            None => Self {
                snapshot: None,
                source: DataSource::None,
                error: Some(error),
            },
        }
    }

    pub fn is_stale(&self) -> bool {
        self.source == DataSource::StaleCache
    }

    /// Collapse to a plain result. Stale data counts as success.
    pub fn into_result(self) -> Result<ForecastSnapshot, WeatherError> {
        match (self.snapshot, self.error) {
            (Some(snapshot), _) => Ok(snapshot),
            (None, Some(error)) => Err(error),
            (None, None) => Err(WeatherError::NoDataAvailable),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub provider: ProviderConfig,
    pub cache_ttl: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            cache_ttl: Duration::minutes(DEFAULT_CACHE_TTL_MINUTES),
        }
    }
}

/// Forecast fetcher with a per-coordinate cache.
///
/// Fetch cycles for the same coordinate are serialized, so a second caller
/// waits for the first and then finds its freshly cached result.
pub struct ForecastFetcher {
    provider: ForecastProvider,
    cache: ForecastCache,
    cache_ttl: Duration,
    key_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ForecastFetcher {
    pub fn new(config: FetcherConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, WeatherError> {
        Ok(Self {
            provider: ForecastProvider::new(config.provider)?,
            cache: ForecastCache::new(store),
            cache_ttl: config.cache_ttl,
            key_locks: Mutex::new(HashMap::new()),
        })
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.key_locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Drop the map entry for `key` once no other caller holds or awaits it.
    fn release_key_lock(&self, key: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.key_locks.lock();
        let ours = locks.get(key).is_some_and(|entry| Arc::ptr_eq(entry, &lock));
        // One reference in the map, one here.
        if ours && Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    /// Run one fetch cycle for `coordinate`.
    pub async fn fetch(&self, coordinate: Coordinate) -> FetchOutcome {
        let key = cache_key(&coordinate);
        let lock = self.key_lock(&key);
        let outcome = {
            let _guard = lock.lock().await;
            self.fetch_cycle(&key, coordinate).await
        };
        self.release_key_lock(&key, lock);
        outcome
    }

    async fn fetch_cycle(&self, key: &str, coordinate: Coordinate) -> FetchOutcome {
        let cached = match self.cache.load(key) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        };

        let now = Utc::now();
        if let Some(entry) = cached.as_ref().filter(|e| e.is_fresh(now, self.cache_ttl)) {
            tracing::debug!(
                "Cache hit for {} ({}s old)",
                key,
                entry.age(now).num_seconds()
            );
            return FetchOutcome::cached(entry.clone());
        }

        match self.provider.fetch(&coordinate).await {
            Ok(snapshot) => {
                if let Err(e) = self.cache.save(key, &snapshot, Utc::now()) {
                    tracing::warn!("Failed to cache forecast for {}: {}", key, e);
                }
                FetchOutcome::fresh(snapshot)
            }
            Err(e) => {
                if cached.is_some() {
                    tracing::warn!("Forecast fetch for {} failed, serving stale data: {}", key, e);
                } else {
                    tracing::warn!("Forecast fetch for {} failed with no cached data: {}", key, e);
                }
                FetchOutcome::failed(e, cached)
            }
        }
    }
}
