//! Open-Meteo forecast provider.

use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use crate::error::WeatherError;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{nullable_f64s, Coordinate, CurrentConditions, ForecastSnapshot, HourlySeries};

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEZONE: &str = "America/Guayaquil";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const HOURLY_FIELDS: &str = "temperature_2m,wind_speed_10m";
const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,apparent_temperature,wind_speed_10m";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timezone: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: OPEN_METEO_URL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    current: ApiCurrent,
    #[serde(default)]
    hourly: Option<ApiHourly>,
}

#[derive(Debug, Deserialize)]
struct ApiCurrent {
    time: Option<String>,
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    wind_speed_10m: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ApiHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default, deserialize_with = "nullable_f64s")]
    temperature_2m: Vec<f64>,
    #[serde(default, deserialize_with = "nullable_f64s")]
    wind_speed_10m: Vec<f64>,
}

/// Parse an Open-Meteo local timestamp (`2025-03-01T14:00`, seconds optional).
pub fn parse_local_time(s: &str) -> Result<NaiveDateTime, WeatherError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| WeatherError::Parse(format!("invalid timestamp {:?}: {}", s, e)))
}

impl ApiResponse {
    fn into_snapshot(self, coordinate: Coordinate) -> Result<ForecastSnapshot, WeatherError> {
        let observed_at = self
            .current
            .time
            .as_deref()
            .map(parse_local_time)
            .transpose()?;

        let hourly = self.hourly.unwrap_or_default();
        let times = hourly
            .time
            .iter()
            .map(|t| parse_local_time(t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ForecastSnapshot {
            coordinate,
            current: CurrentConditions {
                temperature: self.current.temperature_2m,
                apparent_temperature: self.current.apparent_temperature,
                relative_humidity: self.current.relative_humidity_2m,
                wind_speed: self.current.wind_speed_10m,
                observed_at,
            },
            hourly: HourlySeries {
                times,
                temperatures: hourly.temperature_2m,
                wind_speeds: hourly.wind_speed_10m,
            },
        })
    }
}

/// Decode a forecast response body.
pub fn parse_forecast(body: &str, coordinate: Coordinate) -> Result<ForecastSnapshot, WeatherError> {
    let response: ApiResponse =
        serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;
    response.into_snapshot(coordinate)
}

#[derive(Debug, Clone)]
pub struct ForecastProvider {
    client: Client,
    config: ProviderConfig,
}

impl ForecastProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Fetch current and hourly forecast for a coordinate.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self, coordinate: &Coordinate) -> Result<ForecastSnapshot, WeatherError> {
        let latitude = coordinate.latitude.to_string();
        let longitude = coordinate.longitude.to_string();
        let query = [
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("hourly", HOURLY_FIELDS),
            ("current", CURRENT_FIELDS),
            ("timezone", self.config.timezone.as_str()),
        ];

        let response = with_retry(&self.config.retry, || {
            self.client.get(&self.config.base_url).query(&query).send()
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Forecast request for {} returned {}", coordinate, status);
            return Err(WeatherError::RequestFailed {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let snapshot = parse_forecast(&body, *coordinate)?;
        tracing::info!(
            "Fetched forecast for {} ({} hourly entries)",
            coordinate,
            snapshot.hourly.len()
        );
        Ok(snapshot)
    }
}
