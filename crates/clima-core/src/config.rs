use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use clima_weather::fetcher::DEFAULT_CACHE_TTL_MINUTES;
use clima_weather::provider::{DEFAULT_TIMEOUT_SECS, DEFAULT_TIMEZONE, OPEN_METEO_URL};
use clima_weather::retry::DEFAULT_MAX_RETRIES;
use clima_weather::{cities, FetcherConfig, ProviderConfig, RetryConfig};

use crate::error::ConfigError;

/// A single validation finding
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the config file and the forecast cache
    pub config_dir: PathBuf,

    /// City used when no location is given
    #[serde(default = "default_city")]
    pub default_city: String,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_city() -> String {
    cities::DEFAULT_CITY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Forecast endpoint
    pub api_base_url: String,

    /// Time zone the provider reports local times in
    pub timezone: String,

    /// How long a cached forecast is served without asking the provider
    pub cache_ttl_minutes: u32,

    pub request_timeout_secs: u64,

    /// Retries for transient provider failures
    pub max_retries: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: OPEN_METEO_URL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES as u32,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl WeatherConfig {
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            provider: ProviderConfig {
                base_url: self.api_base_url.clone(),
                timezone: self.timezone.clone(),
                timeout: std::time::Duration::from_secs(self.request_timeout_secs),
                retry: RetryConfig {
                    max_retries: self.max_retries,
                    ..RetryConfig::default()
                },
            },
            cache_ttl: chrono::Duration::minutes(i64::from(self.cache_ttl_minutes)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite file name, relative to `config_dir`
    pub file_name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file_name: "weather_cache.db".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clima");

        Self {
            config_dir,
            default_city: default_city(),
            weather: WeatherConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating the
    /// default file if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, creating it with defaults if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; any error fails the load.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.api_base_url, "weather.api_base_url", &mut result);

        if self.weather.timezone.trim().is_empty() {
            result.add_error("weather.timezone", "Time zone must not be empty");
        }

        if self.weather.cache_ttl_minutes == 0 {
            result.add_warning(
                "weather.cache_ttl_minutes",
                "Cache TTL is 0; every request will hit the network",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        if self.weather.max_retries > 10 {
            result.add_warning("weather.max_retries", "More than 10 retries configured");
        }

        if cities::find(&self.default_city).is_none() {
            result.add_error(
                "default_city",
                format!("Unknown city: {}", self.default_city),
            );
        }

        if self.cache.file_name.trim().is_empty() {
            result.add_error("cache.file_name", "Cache file name must not be empty");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Path of the forecast cache database
    pub fn cache_path(&self) -> PathBuf {
        self.config_dir.join(&self.cache.file_name)
    }

    /// Save configuration to the user config directory
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("clima");

        Ok(config_dir.join("config.toml"))
    }
}
