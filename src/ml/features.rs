//! Turns forecast entries into the numeric rows the station models consume.
//!
//! Column order is owned by [`FeatureSchema`], which is built from
//! configuration and checked against every artifact when it is loaded.

use chrono::{Datelike, Duration, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, warn};

use crate::config::ModelsConfig;
use crate::error::ApiError;
use crate::weather::{Condition, Forecast};

/// Forecast days available from the One Call API, today included.
pub const FORECAST_DAYS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hourly,
    Daily,
}

/// Condition groups the models were trained with, in indicator order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
pub enum WeatherCategory {
    Clouds,
    Clear,
    Snow,
    Rain,
    Drizzle,
    Thunderstorm,
}

impl WeatherCategory {
    pub fn from_label(label: &str) -> Option<Self> {
        label.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Temp,
    WindSpeed,
    Humidity,
    Clouds,
    Clear,
    Snow,
    Rain,
    Drizzle,
    Thunderstorm,
    /// Local hour of day, 0-23.
    Hour,
    /// Day of week, Monday = 0.
    Day,
}

impl Feature {
    pub fn category(&self) -> Option<WeatherCategory> {
        match self {
            Feature::Clouds => Some(WeatherCategory::Clouds),
            Feature::Clear => Some(WeatherCategory::Clear),
            Feature::Snow => Some(WeatherCategory::Snow),
            Feature::Rain => Some(WeatherCategory::Rain),
            Feature::Drizzle => Some(WeatherCategory::Drizzle),
            Feature::Thunderstorm => Some(WeatherCategory::Thunderstorm),
            _ => None,
        }
    }

    fn value(&self, snapshot: &WeatherSnapshot) -> f64 {
        if let Some(category) = self.category() {
            return if snapshot.category == Some(category) { 1.0 } else { 0.0 };
        }

        match self {
            Feature::Temp => snapshot.temp,
            Feature::WindSpeed => snapshot.wind_speed,
            Feature::Humidity => snapshot.humidity,
            Feature::Hour => snapshot.hour as f64,
            Feature::Day => snapshot.weekday as f64,
            _ => 0.0,
        }
    }
}

/// The weather entry chosen for a prediction, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub granularity: Granularity,
    pub temp: f64,
    pub wind_speed: f64,
    pub humidity: f64,
    pub condition: String,
    pub category: Option<WeatherCategory>,
    pub icon: String,
    pub hour: u32,
    pub weekday: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub granularity: Granularity,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct FeatureSchema {
    pub granularity: Granularity,
    pub features: Vec<Feature>,
}

impl FeatureSchema {
    pub fn new(granularity: Granularity, features: Vec<Feature>) -> Self {
        Self {
            granularity,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.to_string()).collect()
    }

    pub fn encode(&self, snapshot: &WeatherSnapshot) -> FeatureVector {
        FeatureVector {
            granularity: self.granularity,
            values: self.features.iter().map(|f| f.value(snapshot)).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureSchemas {
    pub hourly: FeatureSchema,
    pub daily: FeatureSchema,
}

impl FeatureSchemas {
    pub fn from_config(config: &ModelsConfig) -> Self {
        Self {
            hourly: FeatureSchema::new(Granularity::Hourly, config.hourly_features.clone()),
            daily: FeatureSchema::new(Granularity::Daily, config.daily_features.clone()),
        }
    }

    pub fn get(&self, granularity: Granularity) -> &FeatureSchema {
        match granularity {
            Granularity::Hourly => &self.hourly,
            Granularity::Daily => &self.daily,
        }
    }
}

/// Local hour of day and number of days from today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastTarget {
    pub hour: u32,
    pub day: u32,
}

impl ForecastTarget {
    pub fn new(hour: u32, day: u32) -> Result<Self, ApiError> {
        if hour > 23 {
            return Err(ApiError::InvalidRequest(format!(
                "hour must be between 0 and 23, got {}",
                hour
            )));
        }
        if day >= FORECAST_DAYS {
            return Err(ApiError::InvalidRequest(format!(
                "day must be between 0 and {}, got {}",
                FORECAST_DAYS - 1,
                day
            )));
        }
        Ok(Self { hour, day })
    }

    fn date(&self, forecast: &Forecast) -> Option<NaiveDate> {
        forecast
            .first_date()
            .map(|today| today + Duration::days(self.day as i64))
    }
}

#[derive(Debug, Clone)]
pub struct Reformatted {
    pub snapshot: WeatherSnapshot,
    pub features: FeatureVector,
}

fn primary_condition(conditions: &[Condition]) -> (String, Option<WeatherCategory>, String) {
    match conditions.first() {
        Some(condition) => (
            condition.main.clone(),
            WeatherCategory::from_label(&condition.main),
            condition.icon.clone(),
        ),
        None => (String::new(), None, String::new()),
    }
}

pub fn select_hourly(forecast: &Forecast, target: ForecastTarget) -> Option<WeatherSnapshot> {
    let date = target.date(forecast)?;

    forecast.hourly.iter().find_map(|entry| {
        let local = forecast.local_time(entry.dt)?;
        if local.date() != date || local.hour() != target.hour {
            return None;
        }

        let (condition, category, icon) = primary_condition(&entry.weather);
        Some(WeatherSnapshot {
            granularity: Granularity::Hourly,
            temp: entry.temp,
            wind_speed: entry.wind_speed,
            humidity: entry.humidity,
            condition,
            category,
            icon,
            hour: target.hour,
            weekday: date.weekday().num_days_from_monday(),
        })
    })
}

pub fn select_daily(forecast: &Forecast, target: ForecastTarget) -> Option<WeatherSnapshot> {
    let date = target.date(forecast)?;

    forecast.daily.iter().find_map(|entry| {
        let local = forecast.local_time(entry.dt)?;
        if local.date() != date {
            return None;
        }

        let (condition, category, icon) = primary_condition(&entry.weather);
        Some(WeatherSnapshot {
            granularity: Granularity::Daily,
            temp: entry.temp.day,
            wind_speed: entry.wind_speed,
            humidity: entry.humidity,
            condition,
            category,
            icon,
            hour: target.hour,
            weekday: date.weekday().num_days_from_monday(),
        })
    })
}

/// Picks the hourly entry for `target`, falling back to the day's aggregate
/// when the hourly forecast does not reach that far.
pub fn reformat(
    forecast: &Forecast,
    target: ForecastTarget,
    schemas: &FeatureSchemas,
) -> Option<Reformatted> {
    let snapshot = match select_hourly(forecast, target) {
        Some(snapshot) => snapshot,
        None => {
            warn!(
                "No hourly forecast for day {} hour {}, deferring to daily forecast",
                target.day, target.hour
            );
            select_daily(forecast, target)?
        }
    };

    let features = schemas.get(snapshot.granularity).encode(&snapshot);
    debug!(
        "Encoded {} features for {} forecast",
        features.values.len(),
        features.granularity
    );

    Some(Reformatted { snapshot, features })
}
