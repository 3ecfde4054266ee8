use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Geographic coordinate of a forecast request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Current weather conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub relative_humidity: f64,
    pub wind_speed: f64,
    pub observed_at: Option<NaiveDateTime>,
}

/// Hourly forecast as three index-aligned sequences.
///
/// Entry `i` of each sequence describes the same hour. The provider does not
/// enforce equal lengths; consumers check [`HourlySeries::is_aligned`].
/// Hours without a value hold NaN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    pub times: Vec<NaiveDateTime>,
    #[serde(deserialize_with = "nullable_f64s")]
    pub temperatures: Vec<f64>,
    #[serde(deserialize_with = "nullable_f64s")]
    pub wind_speeds: Vec<f64>,
}

/// Read a number sequence where missing values are `null`, keeping them as NaN.
///
/// serde_json writes NaN back out as `null`, so cached series read the same way.
pub(crate) fn nullable_f64s<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// One hour of the forecast, borrowed out of a [`HourlySeries`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyEntry {
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub wind_speed: f64,
}

impl HourlySeries {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// True when all three sequences have the same length.
    pub fn is_aligned(&self) -> bool {
        self.times.len() == self.temperatures.len() && self.times.len() == self.wind_speeds.len()
    }

    /// Iterate over whole hours; stops at the shortest sequence.
    pub fn entries(&self) -> impl Iterator<Item = HourlyEntry> + '_ {
        self.times
            .iter()
            .zip(&self.temperatures)
            .zip(&self.wind_speeds)
            .map(|((time, temperature), wind_speed)| HourlyEntry {
                time: *time,
                temperature: *temperature,
                wind_speed: *wind_speed,
            })
    }
}

/// Current and hourly forecast for one coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    pub coordinate: Coordinate,
    pub current: CurrentConditions,
    pub hourly: HourlySeries,
}
