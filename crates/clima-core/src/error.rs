//! Application-level error types.
//!
//! Library crates return their own typed errors; this module gathers them
//! for the binary and maps each to a message fit for the terminal.

use std::sync::Arc;

use clima_weather::WeatherError;
use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Shared so a session's last error can be returned as is.
    #[error("Weather error: {0}")]
    Weather(#[from] Arc<WeatherError>),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        AppError::Weather(Arc::new(e))
    }
}

impl AppError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Weather(e) => e.user_message(),
            AppError::Config(e) => e.user_message().to_string(),
            AppError::Io(_) => "A file operation failed. Please try again.".to_string(),
            AppError::Other(e) => match e.downcast_ref::<ConfigError>() {
                Some(config_error) => config_error.user_message().to_string(),
                None => "An unexpected error occurred. Please try again.".to_string(),
            },
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Unknown city: {0}")]
    UnknownCity(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::UnknownCity(_) => "Unknown city. Run `clima cities` to list them.",
        }
    }
}
