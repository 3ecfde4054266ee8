use std::sync::Arc;

use clima_weather::{
    cities, Coordinate, FetchState, ForecastFetcher, ForecastSession, SqliteStore, WeatherError,
};

use crate::error::{AppError, ConfigError};
use crate::Config;

/// A location resolved from user input
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedLocation {
    pub label: String,
    pub coordinate: Coordinate,
}

/// Application state: configuration plus the forecast session built from it
pub struct App {
    config: Arc<Config>,
    session: ForecastSession,
}

impl App {
    /// Load and validate configuration, then open the cache
    pub fn new() -> Result<Self, AppError> {
        let (config, _) = Config::load_validated()?;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.config_dir)?;

        let cache_path = config.cache_path();
        let store = SqliteStore::new(&cache_path)
            .map_err(|e| WeatherError::Cache(format!("{}: {}", cache_path.display(), e)))?;
        tracing::debug!("Forecast cache at {}", cache_path.display());

        let fetcher = ForecastFetcher::new(config.weather.fetcher_config(), Arc::new(store))?;

        Ok(Self {
            config: Arc::new(config),
            session: ForecastSession::new(Arc::new(fetcher)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &ForecastSession {
        &self.session
    }

    /// Select `coordinate` and return the resulting state.
    ///
    /// Fails with the provider's error only when there is no data at all;
    /// stale data comes back as `Ok` with `error` set.
    pub async fn load_forecast(&self, coordinate: Coordinate) -> Result<FetchState, AppError> {
        self.session.select(coordinate).await;
        let state = self.session.state();

        if state.data.is_none() {
            let error = state
                .error
                .unwrap_or_else(|| Arc::new(WeatherError::NoDataAvailable));
            return Err(AppError::Weather(error));
        }

        Ok(state)
    }

    /// Resolve a location: explicit coordinate, then city name, then the
    /// configured default city.
    pub fn resolve_location(
        &self,
        city: Option<&str>,
        coordinate: Option<Coordinate>,
    ) -> Result<SelectedLocation, ConfigError> {
        if let Some(coordinate) = coordinate {
            return Ok(SelectedLocation {
                label: coordinate.to_string(),
                coordinate,
            });
        }

        let name = city.unwrap_or(&self.config.default_city);
        let city = cities::find(name).ok_or_else(|| ConfigError::UnknownCity(name.to_string()))?;

        Ok(SelectedLocation {
            label: format!("{}, Ecuador", city.name),
            coordinate: city.coordinate,
        })
    }
}
