//! Integration tests for ForecastFetcher and ForecastSession using wiremock.
//!
//! A mock Open-Meteo server stands in for the provider so cache hits, stale
//! fallbacks and superseded requests can be observed by counting calls.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use clima_weather::{
    cache_key, AlertCategory, AlertSeverity, Coordinate, DataSource, FetcherConfig,
    ForecastCache, ForecastFetcher, ForecastSession, KeyValueStore, MemoryStore, ProviderConfig,
    RetryConfig, WeatherError,
};
use clima_weather::provider::parse_forecast;
use clima_weather::ForecastSnapshot;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GUAYAQUIL: Coordinate = Coordinate {
    latitude: -2.1962,
    longitude: -79.8862,
};
const QUITO: Coordinate = Coordinate {
    latitude: -0.2298,
    longitude: -78.525,
};

/// Open-Meteo style body with one entry per hour starting at midnight
fn forecast_body(temperatures: &[f64], wind_speeds: &[f64]) -> serde_json::Value {
    let times: Vec<String> = (0..temperatures.len())
        .map(|h| format!("2025-03-01T{:02}:00", h))
        .collect();

    serde_json::json!({
        "latitude": -2.25,
        "longitude": -79.875,
        "timezone": "America/Guayaquil",
        "current": {
            "time": "2025-03-01T09:45",
            "interval": 900,
            "temperature_2m": temperatures.first().copied().unwrap_or(25.0),
            "relative_humidity_2m": 78,
            "apparent_temperature": 28.1,
            "wind_speed_10m": wind_speeds.first().copied().unwrap_or(5.0)
        },
        "hourly": {
            "time": times,
            "temperature_2m": temperatures,
            "wind_speed_10m": wind_speeds
        }
    })
}

fn stable_body() -> serde_json::Value {
    forecast_body(&[20.0, 20.0, 20.0, 20.0], &[5.0, 5.0, 5.0, 5.0])
}

fn fetcher_for(server: &MockServer, store: Arc<MemoryStore>) -> ForecastFetcher {
    let config = FetcherConfig {
        provider: ProviderConfig {
            base_url: format!("{}/v1/forecast", server.uri()),
            retry: RetryConfig::none(),
            ..ProviderConfig::default()
        },
        cache_ttl: Duration::minutes(10),
    };
    ForecastFetcher::new(config, store).unwrap()
}

/// Seed the cache with a snapshot fetched `age` ago
fn seed_cache(
    store: &Arc<MemoryStore>,
    coordinate: Coordinate,
    temperature: f64,
    age: Duration,
) -> ForecastSnapshot {
    let body = forecast_body(&[temperature, temperature], &[5.0, 5.0]);
    let snapshot = parse_forecast(&body.to_string(), coordinate).unwrap();
    ForecastCache::new(store.clone())
        .save(&cache_key(&coordinate), &snapshot, Utc::now() - age)
        .unwrap();
    snapshot
}

#[tokio::test]
async fn test_fresh_fetch_sends_expected_query_and_caches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "-2.1962"))
        .and(query_param("longitude", "-79.8862"))
        .and(query_param("hourly", "temperature_2m,wind_speed_10m"))
        .and(query_param(
            "current",
            "temperature_2m,relative_humidity_2m,apparent_temperature,wind_speed_10m",
        ))
        .and(query_param("timezone", "America/Guayaquil"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stable_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let fetcher = fetcher_for(&mock_server, store.clone());

    let outcome = fetcher.fetch(GUAYAQUIL).await;

    assert_eq!(outcome.source, DataSource::Network);
    assert!(outcome.error.is_none());
    let snapshot = outcome.snapshot.unwrap();
    assert_eq!(snapshot.coordinate, GUAYAQUIL);
    assert_eq!(snapshot.hourly.len(), 4);

    let raw = store.get("weather_-2.1962_-79.8862").unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value["data"].is_object());
    assert!(value["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_fresh_cache_skips_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stable_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let cached = seed_cache(&store, QUITO, 14.0, Duration::minutes(5));
    let fetcher = fetcher_for(&mock_server, store);

    let outcome = fetcher.fetch(QUITO).await;

    assert_eq!(outcome.source, DataSource::Cache);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.snapshot.unwrap(), cached);
}

#[tokio::test]
async fn test_expired_cache_is_refreshed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stable_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    seed_cache(&store, GUAYAQUIL, 33.0, Duration::minutes(20));
    let fetcher = fetcher_for(&mock_server, store.clone());
    let before = Utc::now().timestamp_millis();

    let outcome = fetcher.fetch(GUAYAQUIL).await;

    assert_eq!(outcome.source, DataSource::Network);
    assert_eq!(outcome.snapshot.unwrap().hourly.temperatures, vec![20.0; 4]);

    let entry = ForecastCache::new(store)
        .load(&cache_key(&GUAYAQUIL))
        .unwrap()
        .unwrap();
    assert!(entry.timestamp >= before);
}

#[tokio::test]
async fn test_failure_serves_stale_cache_with_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let stale = seed_cache(&store, GUAYAQUIL, 26.0, Duration::minutes(20));
    let fetcher = fetcher_for(&mock_server, store);

    let outcome = fetcher.fetch(GUAYAQUIL).await;

    assert!(outcome.is_stale());
    assert!(matches!(
        outcome.error,
        Some(WeatherError::RequestFailed { status: 500 })
    ));
    assert_eq!(outcome.snapshot.unwrap(), stale);
}

#[tokio::test]
async fn test_failure_without_cache_returns_no_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let fetcher = fetcher_for(&mock_server, store.clone());

    let outcome = fetcher.fetch(QUITO).await;

    assert_eq!(outcome.source, DataSource::None);
    assert!(outcome.snapshot.is_none());
    assert!(store.is_empty());
    assert!(matches!(
        outcome.into_result(),
        Err(WeatherError::RequestFailed { status: 404 })
    ));
}

#[tokio::test]
async fn test_unparseable_body_falls_back_to_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let stale = seed_cache(&store, QUITO, 12.0, Duration::hours(3));
    let fetcher = fetcher_for(&mock_server, store);

    let outcome = fetcher.fetch(QUITO).await;

    assert!(matches!(outcome.error, Some(WeatherError::Parse(_))));
    assert_eq!(outcome.snapshot.unwrap(), stale);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stable_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = FetcherConfig {
        provider: ProviderConfig {
            base_url: format!("{}/v1/forecast", mock_server.uri()),
            retry: RetryConfig::new(2, 10, 50),
            ..ProviderConfig::default()
        },
        cache_ttl: Duration::minutes(10),
    };
    let fetcher = ForecastFetcher::new(config, Arc::new(MemoryStore::new())).unwrap();

    let outcome = fetcher.fetch(GUAYAQUIL).await;

    assert_eq!(outcome.source, DataSource::Network);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_concurrent_fetches_for_same_coordinate_hit_network_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(stable_body())
                .set_delay(StdDuration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = fetcher_for(&mock_server, Arc::new(MemoryStore::new()));

    let (first, second) = tokio::join!(fetcher.fetch(GUAYAQUIL), fetcher.fetch(GUAYAQUIL));

    let mut sources = vec![first.source, second.source];
    sources.sort_by_key(|s| *s == DataSource::Cache);
    assert_eq!(sources, vec![DataSource::Network, DataSource::Cache]);
    assert_eq!(first.snapshot, second.snapshot);
}

#[tokio::test]
async fn test_session_latest_selection_wins() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "-2.1962"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body(&[32.0, 29.0], &[10.0, 12.0]))
                .set_delay(StdDuration::from_millis(400)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "-0.2298"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stable_body()))
        .mount(&mock_server)
        .await;

    let fetcher = Arc::new(fetcher_for(&mock_server, Arc::new(MemoryStore::new())));
    let session = ForecastSession::new(fetcher);

    let (older, newer) = tokio::join!(session.select(GUAYAQUIL), async {
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        session.select(QUITO).await
    });

    assert!(!older);
    assert!(newer);

    let state = session.state();
    assert!(!state.loading);
    assert_eq!(state.coordinate, Some(QUITO));
    assert_eq!(state.data.as_ref().unwrap().coordinate, QUITO);
    assert!(state.alerts().is_empty());
}

#[tokio::test]
async fn test_session_state_carries_alerts_and_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "-2.1962"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body(&[32.0, 29.0, 27.0, 26.0], &[10.0, 12.0, 8.0, 9.0])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "-0.2298"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let fetcher = Arc::new(fetcher_for(&mock_server, Arc::new(MemoryStore::new())));
    let session = ForecastSession::new(fetcher);

    assert!(session.select(GUAYAQUIL).await);
    let state = session.state();
    assert!(state.error.is_none());
    let alerts = state.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Error);
    assert_eq!(alerts[0].category, AlertCategory::Heat);
    assert!(alerts[0].description.contains("00:00"));

    assert!(session.select(QUITO).await);
    let state = session.state();
    assert!(state.data.is_none());
    let error = state.error.unwrap();
    assert!(matches!(*error, WeatherError::RequestFailed { status: 502 }));
    assert!(error.to_string().contains("502"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_selections_keep_coordinate_and_data_paired() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stable_body()))
        .mount(&mock_server)
        .await;

    let fetcher = Arc::new(fetcher_for(&mock_server, Arc::new(MemoryStore::new())));
    let session = Arc::new(ForecastSession::new(fetcher));
    let coordinates = [
        GUAYAQUIL,
        QUITO,
        Coordinate::new(-0.9677, -80.7089),
        Coordinate::new(-2.9006, -79.0045),
    ];

    for _ in 0..10 {
        let handles: Vec<_> = coordinates
            .iter()
            .cycle()
            .take(16)
            .map(|&coordinate| {
                let session = session.clone();
                tokio::spawn(async move { session.select(coordinate).await })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap() {
                applied += 1;
            }
        }
        assert!(applied >= 1);

        let state = session.state();
        assert!(!state.loading);
        assert_eq!(state.coordinate, Some(state.data.as_ref().unwrap().coordinate));
    }
}
