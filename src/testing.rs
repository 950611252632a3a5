//! Fixtures shared by the unit tests.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::db::models::{LatestReading, StationSnapshot, WeatherObservation};
use crate::db::{DynamicReading, StaticStation, StationStore};
use crate::error::{StoreError, WeatherError};
use crate::ml::features::{FeatureSchema, Granularity};
use crate::weather::forecast::{DailyForecast, DailyTemperature, HourlyForecast};
use crate::weather::{Condition, Forecast, ForecastSource};

const TIMEZONE_OFFSET: i64 = 3600;

fn today() -> NaiveDate {
    // a Monday
    NaiveDate::from_ymd_opt(2021, 4, 12).unwrap()
}

fn local_timestamp(day: u32, hour: u32) -> i64 {
    let local = today().and_hms_opt(hour, 0, 0).unwrap() + chrono::Duration::days(day as i64);
    local.and_utc().timestamp() - TIMEZONE_OFFSET
}

fn condition(main: &str, icon: &str) -> Vec<Condition> {
    vec![Condition {
        main: main.to_string(),
        description: main.to_lowercase(),
        icon: icon.to_string(),
    }]
}

pub fn hourly_entry(day: u32, hour: u32, main: &str) -> HourlyForecast {
    HourlyForecast {
        dt: local_timestamp(day, hour),
        temp: 282.0,
        wind_speed: 4.0,
        humidity: 75.0,
        weather: condition(main, "04d"),
    }
}

pub fn daily_entry(day: u32, temp: f64, main: &str) -> DailyForecast {
    DailyForecast {
        dt: local_timestamp(day, 12),
        temp: DailyTemperature {
            day: temp,
            min: Some(temp - 5.0),
            max: Some(temp + 2.0),
        },
        wind_speed: 5.0,
        humidity: 70.0,
        weather: condition(main, "01d"),
    }
}

/// 48 hourly entries from day 0 15:00 to day 2 14:00 local, and eight days
/// of daily entries. Day 2 at 14:00 is rainy; every other hour is cloudy
/// and every day is clear.
pub fn forecast_fixture() -> Forecast {
    let mut forecast = Forecast {
        timezone_offset: TIMEZONE_OFFSET,
        hourly: Vec::new(),
        daily: Vec::new(),
    };

    for day in 0..8 {
        forecast.daily.push(daily_entry(day, 285.0, "Clear"));
    }

    for offset in 0..48 {
        let absolute = 15 + offset;
        let (day, hour) = (absolute / 24, absolute % 24);
        let mut entry = hourly_entry(day, hour, "Clouds");
        if day == 2 && hour == 14 {
            entry.temp = 280.0;
            entry.wind_speed = 3.2;
            entry.humidity = 80.0;
            entry.weather = condition("Rain", "10d");
        }
        forecast.hourly.push(entry);
    }

    forecast
}

pub fn station(number: i32, name: &str, bike_stands: i32) -> StaticStation {
    StaticStation {
        number,
        name: name.to_string(),
        address: name.to_string(),
        pos_lat: 53.34,
        pos_lng: -6.26,
        bike_stands,
    }
}

fn parse_time(time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn snapshot(number: i32, name: &str) -> StationSnapshot {
    StationSnapshot {
        number,
        available_bike_stands: 10,
        available_bikes: 10,
        last_update: parse_time("2021-04-12 09:00:00"),
        name: name.to_string(),
        address: name.to_string(),
        pos_lat: 53.34,
        pos_lng: -6.26,
        bike_stands: 20,
    }
}

pub fn observation(time: &str, main: &str) -> WeatherObservation {
    WeatherObservation {
        dt: parse_time(time),
        main: main.to_string(),
        description: main.to_lowercase(),
        temp: 283.0,
        wind_speed: 4.1,
        humidity: 71.0,
        icon: Some("04d".to_string()),
    }
}

pub fn reading(number: i32, time: &str, bikes: i32, stands: i32) -> DynamicReading {
    DynamicReading {
        number,
        available_bike_stands: stands,
        available_bikes: bikes,
        last_update: parse_time(time),
    }
}

pub fn linear_artifact(schema: &FeatureSchema, coefficients: &[f64], intercept: f64) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "features": schema.names(),
        "model": {
            "type": "linear",
            "coefficients": coefficients,
            "intercept": intercept,
        }
    }))
    .unwrap()
}

/// Two trees: a single split on `feature`, and a constant.
pub fn forest_artifact(
    schema: &FeatureSchema,
    feature: usize,
    threshold: f64,
    low: f64,
    high: f64,
    constant: f64,
) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "features": schema.names(),
        "model": {
            "type": "random_forest",
            "trees": [
                {"nodes": [
                    {"feature": feature, "threshold": threshold, "left": 1, "right": 2},
                    {"value": low},
                    {"value": high}
                ]},
                {"nodes": [{"value": constant}]}
            ]
        }
    }))
    .unwrap()
}

pub fn write_model(dir: &Path, granularity: Granularity, station_id: i32, bytes: &[u8]) {
    let dir = dir.join(granularity.to_string());
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("station_{}.json", station_id)), bytes).unwrap();
}

/// Mirrors the ordering the SQL queries guarantee.
#[derive(Default)]
pub struct InMemoryStore {
    stations: Vec<StaticStation>,
    snapshots: Vec<StationSnapshot>,
    observations: Vec<WeatherObservation>,
    readings: Vec<DynamicReading>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryStore {
    pub fn with_station(mut self, station: StaticStation) -> Self {
        self.stations.push(station);
        self
    }

    pub fn with_snapshot(mut self, snapshot: StationSnapshot) -> Self {
        self.snapshots.push(snapshot);
        self
    }

    pub fn with_observation(mut self, observation: WeatherObservation) -> Self {
        self.observations.push(observation);
        self
    }

    pub fn with_reading(mut self, reading: DynamicReading) -> Self {
        self.readings.push(reading);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StationStore for InMemoryStore {
    async fn static_stations(&self) -> Result<Vec<StaticStation>, StoreError> {
        self.record();
        let mut stations = self.stations.clone();
        stations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stations)
    }

    async fn station(&self, station_id: i32) -> Result<Option<StaticStation>, StoreError> {
        self.record();
        Ok(self.stations.iter().find(|s| s.number == station_id).cloned())
    }

    async fn latest_readings(&self) -> Result<Vec<LatestReading>, StoreError> {
        self.record();
        let mut latest: Vec<LatestReading> = Vec::new();
        for r in &self.readings {
            match latest.iter_mut().find(|l| l.number == r.number) {
                Some(l) if l.last_update < r.last_update => {
                    l.available_bikes = r.available_bikes;
                    l.available_bike_stands = r.available_bike_stands;
                    l.last_update = r.last_update;
                }
                Some(_) => {}
                None => latest.push(LatestReading {
                    number: r.number,
                    available_bike_stands: r.available_bike_stands,
                    available_bikes: r.available_bikes,
                    last_update: r.last_update,
                }),
            }
        }
        latest.sort_by_key(|l| l.number);
        Ok(latest)
    }

    async fn station_snapshots(&self) -> Result<Vec<StationSnapshot>, StoreError> {
        self.record();
        Ok(self.snapshots.clone())
    }

    async fn recent_weather(&self) -> Result<Vec<WeatherObservation>, StoreError> {
        self.record();
        let mut observations = self.observations.clone();
        observations.sort_by(|a, b| b.dt.cmp(&a.dt));
        Ok(observations)
    }

    async fn readings_since(
        &self,
        station_id: i32,
        since: NaiveDateTime,
    ) -> Result<Vec<DynamicReading>, StoreError> {
        self.record();
        let mut readings: Vec<_> = self
            .readings
            .iter()
            .filter(|r| r.number == station_id && r.last_update >= since)
            .cloned()
            .collect();
        readings.sort_by_key(|r| r.last_update);
        Ok(readings)
    }
}

pub struct StaticForecast(pub Forecast);

#[async_trait]
impl ForecastSource for StaticForecast {
    async fn fetch_forecast(&self) -> Result<Forecast, WeatherError> {
        Ok(self.0.clone())
    }
}

pub struct FailingForecast;

#[async_trait]
impl ForecastSource for FailingForecast {
    async fn fetch_forecast(&self) -> Result<Forecast, WeatherError> {
        Err(WeatherError::ApiError {
            status: 401,
            message: "Invalid API key".to_string(),
        })
    }
}
