use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Subset of the One Call response this service reads. `current` and
/// `minutely` are excluded at request time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Forecast {
    #[serde(default)]
    pub timezone_offset: i64,
    #[serde(default)]
    pub hourly: Vec<HourlyForecast>,
    #[serde(default)]
    pub daily: Vec<DailyForecast>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HourlyForecast {
    pub dt: i64,
    pub temp: f64,
    pub wind_speed: f64,
    pub humidity: f64,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DailyForecast {
    pub dt: i64,
    pub temp: DailyTemperature,
    pub wind_speed: f64,
    pub humidity: f64,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DailyTemperature {
    pub day: f64,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Condition {
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

impl Forecast {
    /// Converts a unix timestamp into wall-clock time at the forecast location.
    pub fn local_time(&self, dt: i64) -> Option<NaiveDateTime> {
        DateTime::from_timestamp(dt + self.timezone_offset, 0).map(|t| t.naive_utc())
    }

    /// The local date the forecast treats as "today".
    pub fn first_date(&self) -> Option<NaiveDate> {
        let first = self
            .daily
            .first()
            .map(|entry| entry.dt)
            .or_else(|| self.hourly.first().map(|entry| entry.dt))?;
        self.local_time(first).map(|t| t.date())
    }
}
