//! Weather-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Forecast request failed with status {status}")]
    RequestFailed { status: u16 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("No forecast data available")]
    NoDataAvailable,
}

impl WeatherError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::RequestFailed { status } if *status >= 500 => {
                "The forecast service is having problems. Please try again later.".to_string()
            }
            Self::RequestFailed { status } => {
                format!("The forecast request was rejected (HTTP {}).", status)
            }
            Self::Network(e) if e.is_timeout() => {
                "The forecast service did not answer in time.".to_string()
            }
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Parse(_) => "Received an unexpected forecast response.".to_string(),
            Self::Cache(_) => "Local forecast cache error".to_string(),
            Self::NoDataAvailable => "No forecast data is available yet.".to_string(),
        }
    }
}
