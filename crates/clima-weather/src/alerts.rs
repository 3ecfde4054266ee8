//! Threshold alerts derived from the next hours of an hourly forecast.
//!
//! Four independent categories are checked in a fixed order: heat, cold,
//! wind and sharp temperature changes. Each contributes at most one record,
//! so a forecast yields between zero and four alerts.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::ForecastSnapshot;

/// Only this many leading hours are evaluated.
pub const ALERT_WINDOW_HOURS: usize = 12;

pub const EXTREME_HEAT_C: f64 = 30.0;
pub const ELEVATED_HEAT_C: f64 = 28.0;
pub const EXTREME_COLD_C: f64 = 5.0;
pub const LOW_TEMPERATURE_C: f64 = 10.0;
pub const STRONG_WIND_KMH: f64 = 30.0;
pub const MODERATE_WIND_KMH: f64 = 20.0;
pub const SHARP_CHANGE_C: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Success,
}

impl AlertSeverity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

/// Which rule produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Heat,
    Cold,
    Wind,
    TemperatureChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub severity: AlertSeverity,
    pub category: AlertCategory,
    pub title: String,
    pub description: String,
}

impl AlertRecord {
    fn new(
        severity: AlertSeverity,
        category: AlertCategory,
        title: &str,
        description: String,
    ) -> Self {
        Self {
            severity,
            category,
            title: title.to_string(),
            description,
        }
    }
}

fn format_hour(time: &NaiveDateTime) -> String {
    time.format("%H:%M").to_string()
}

/// Index and value of the first maximum.
fn first_max(values: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

/// Index and value of the first minimum.
fn first_min(values: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

fn check_heat(temperatures: &[f64], times: &[NaiveDateTime]) -> Option<AlertRecord> {
    let (index, max) = first_max(temperatures)?;

    if max > EXTREME_HEAT_C {
        Some(AlertRecord::new(
            AlertSeverity::Error,
            AlertCategory::Heat,
            "Extreme Heat Alert",
            format!(
                "Very high temperature of {:.1}°C expected around {}. Drink water frequently.",
                max,
                format_hour(&times[index])
            ),
        ))
    } else if max > ELEVATED_HEAT_C {
        Some(AlertRecord::new(
            AlertSeverity::Warning,
            AlertCategory::Heat,
            "Elevated Temperature Notice",
            format!(
                "Temperatures up to {:.1}°C in the coming hours. Stay hydrated.",
                max
            ),
        ))
    } else {
        None
    }
}

fn check_cold(temperatures: &[f64], times: &[NaiveDateTime]) -> Option<AlertRecord> {
    let (index, min) = first_min(temperatures)?;

    if min < EXTREME_COLD_C {
        Some(AlertRecord::new(
            AlertSeverity::Error,
            AlertCategory::Cold,
            "Extreme Cold Alert",
            format!(
                "Very low temperature of {:.1}°C expected around {}. Dress warmly.",
                min,
                format_hour(&times[index])
            ),
        ))
    } else if min < LOW_TEMPERATURE_C {
        Some(AlertRecord::new(
            AlertSeverity::Warning,
            AlertCategory::Cold,
            "Low Temperature Notice",
            format!(
                "Temperatures down to {:.1}°C in the coming hours. Bring a jacket.",
                min
            ),
        ))
    } else {
        None
    }
}

fn check_wind(wind_speeds: &[f64], times: &[NaiveDateTime]) -> Option<AlertRecord> {
    let (index, max) = first_max(wind_speeds)?;

    if max > STRONG_WIND_KMH {
        Some(AlertRecord::new(
            AlertSeverity::Error,
            AlertCategory::Wind,
            "Strong Wind Alert",
            format!(
                "Very strong wind of {:.1} km/h expected around {}. Take care outdoors.",
                max,
                format_hour(&times[index])
            ),
        ))
    } else if max > MODERATE_WIND_KMH {
        Some(AlertRecord::new(
            AlertSeverity::Warning,
            AlertCategory::Wind,
            "Wind Notice",
            format!(
                "Moderate to strong wind up to {:.1} km/h in the coming hours.",
                max
            ),
        ))
    } else {
        None
    }
}

fn check_temperature_change(
    temperatures: &[f64],
    times: &[NaiveDateTime],
) -> Option<AlertRecord> {
    let mut largest = 0.0;
    let mut at = None;

    for i in 1..temperatures.len() {
        let change = (temperatures[i] - temperatures[i - 1]).abs();
        if change > largest {
            largest = change;
            at = Some(i);
        }
    }

    let index = at?;
    if largest <= SHARP_CHANGE_C {
        return None;
    }

    Some(AlertRecord::new(
        AlertSeverity::Info,
        AlertCategory::TemperatureChange,
        "Temperature Change Notice",
        format!(
            "Sharp temperature change of {:.1}°C expected around {}.",
            largest,
            format_hour(&times[index])
        ),
    ))
}

/// Derive alerts for the next [`ALERT_WINDOW_HOURS`] hours of a forecast.
///
/// Returns an empty list when the hourly data is empty, misaligned or holds
/// non-finite values. Never panics and never modifies the snapshot.
pub fn derive_alerts(snapshot: &ForecastSnapshot) -> Vec<AlertRecord> {
    let hourly = &snapshot.hourly;

    if hourly.is_empty() || !hourly.is_aligned() {
        tracing::debug!(
            "Skipping alerts: {} times, {} temperatures, {} wind speeds",
            hourly.times.len(),
            hourly.temperatures.len(),
            hourly.wind_speeds.len()
        );
        return Vec::new();
    }

    let window = hourly.len().min(ALERT_WINDOW_HOURS);
    let times = &hourly.times[..window];
    let temperatures = &hourly.temperatures[..window];
    let wind_speeds = &hourly.wind_speeds[..window];

    if temperatures
        .iter()
        .chain(wind_speeds)
        .any(|v| !v.is_finite())
    {
        tracing::warn!("Skipping alerts: forecast contains non-finite values");
        return Vec::new();
    }

    [
        check_heat(temperatures, times),
        check_cold(temperatures, times),
        check_wind(wind_speeds, times),
        check_temperature_change(temperatures, times),
    ]
    .into_iter()
    .flatten()
    .collect()
}
