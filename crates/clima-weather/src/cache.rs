//! Per-coordinate forecast cache on top of a [`KeyValueStore`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::WeatherError;
use crate::store::KeyValueStore;
use crate::types::{Coordinate, ForecastSnapshot};

/// Cache key for a coordinate, e.g. `weather_-2.1962_-79.8862`.
pub fn cache_key(coordinate: &Coordinate) -> String {
    format!("weather_{}_{}", coordinate.latitude, coordinate.longitude)
}

/// Stored value: the snapshot and when it was fetched (epoch millis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: ForecastSnapshot,
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(data: ForecastSnapshot, fetched_at: DateTime<Utc>) -> Self {
        Self {
            data,
            timestamp: fetched_at.timestamp_millis(),
        }
    }

    /// Age of the entry at `now`; negative when the entry is from the future.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        Duration::milliseconds(now.timestamp_millis() - self.timestamp)
    }

    /// An entry is fresh while its age is strictly below the TTL.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

#[derive(Clone)]
pub struct ForecastCache {
    store: Arc<dyn KeyValueStore>,
}

impl ForecastCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the entry stored under `key`.
    pub fn load(&self, key: &str) -> Result<Option<CacheEntry>, WeatherError> {
        let raw = self
            .store
            .get(key)
            .map_err(|e| WeatherError::Cache(e.to_string()))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| WeatherError::Cache(format!("corrupt entry {}: {}", key, e))),
            None => Ok(None),
        }
    }

    /// Write (or supersede) the entry stored under `key`.
    pub fn save(
        &self,
        key: &str,
        snapshot: &ForecastSnapshot,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), WeatherError> {
        let entry = CacheEntry::new(snapshot.clone(), fetched_at);
        let json = serde_json::to_string(&entry).map_err(|e| WeatherError::Cache(e.to_string()))?;
        self.store
            .set(key, &json)
            .map_err(|e| WeatherError::Cache(e.to_string()))?;
        tracing::debug!("Cached forecast under {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{CurrentConditions, HourlySeries};

    fn snapshot() -> ForecastSnapshot {
        ForecastSnapshot {
            coordinate: Coordinate::new(-0.2298, -78.525),
            current: CurrentConditions {
                temperature: 14.2,
                apparent_temperature: 13.0,
                relative_humidity: 72.0,
                wind_speed: 6.1,
                observed_at: None,
            },
            hourly: HourlySeries::default(),
        }
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(
            cache_key(&Coordinate::new(-2.1962, -79.8862)),
            "weather_-2.1962_-79.8862"
        );
        assert_eq!(cache_key(&Coordinate::new(1.5, 0.0)), "weather_1.5_0");
    }

    #[test]
    fn test_freshness_window() {
        let now = Utc::now();
        let ttl = Duration::minutes(10);

        let recent = CacheEntry::new(snapshot(), now - Duration::minutes(5));
        assert!(recent.is_fresh(now, ttl));

        let expired = CacheEntry::new(snapshot(), now - Duration::minutes(20));
        assert!(!expired.is_fresh(now, ttl));

        let boundary = CacheEntry::new(snapshot(), now - ttl);
        assert!(!boundary.is_fresh(now, ttl));
    }

    #[test]
    fn test_save_and_load() {
        let cache = ForecastCache::new(Arc::new(MemoryStore::new()));
        let fetched_at = Utc::now();

        cache.save("k", &snapshot(), fetched_at).unwrap();
        let entry = cache.load("k").unwrap().unwrap();

        assert_eq!(entry.data, snapshot());
        assert_eq!(entry.timestamp, fetched_at.timestamp_millis());
    }

    #[test]
    fn test_entry_json_shape() {
        let store = Arc::new(MemoryStore::new());
        let cache = ForecastCache::new(store.clone());
        cache.save("k", &snapshot(), Utc::now()).unwrap();

        let raw = store.get("k").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("data").is_some());
        assert!(value.get("timestamp").unwrap().is_i64());
    }

    #[test]
    fn test_corrupt_entry_is_cache_error() {
        let store = Arc::new(MemoryStore::new());
        store.set("k", "not json").unwrap();
        let cache = ForecastCache::new(store);

        assert!(matches!(cache.load("k"), Err(WeatherError::Cache(_))));
    }
}
