//! Forecast data for Ecuadorian cities
//!
//! Fetches current and hourly forecasts from the Open-Meteo API through a
//! short-lived per-location cache, and derives threshold alerts from the
//! next hours of the forecast.

pub mod alerts;
pub mod cache;
pub mod cities;
pub mod error;
pub mod fetcher;
pub mod provider;
pub mod retry;
pub mod session;
pub mod store;
pub mod types;

pub use alerts::{derive_alerts, AlertCategory, AlertRecord, AlertSeverity};
pub use cache::{cache_key, CacheEntry, ForecastCache};
pub use cities::City;
pub use error::WeatherError;
pub use fetcher::{DataSource, FetchOutcome, FetcherConfig, ForecastFetcher};
pub use provider::{ForecastProvider, ProviderConfig};
pub use retry::RetryConfig;
pub use session::{FetchState, ForecastSession};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use types::*;
