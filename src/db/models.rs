use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

// Rows of `static_bikes`
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StaticStation {
    pub number: i32,
    pub name: String,
    pub address: String,
    pub pos_lat: f64,
    pub pos_lng: f64,
    pub bike_stands: i32,
}

// Most recent `dynamic_bikes` row per station
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LatestReading {
    pub number: i32,
    pub available_bike_stands: i32,
    pub available_bikes: i32,
    pub last_update: NaiveDateTime,
}

/// A station joined with its latest reading, as listed by `/allBikes`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StationSnapshot {
    pub number: i32,
    pub available_bike_stands: i32,
    pub available_bikes: i32,
    pub last_update: NaiveDateTime,
    pub name: String,
    pub address: String,
    pub pos_lat: f64,
    pub pos_lng: f64,
    pub bike_stands: i32,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DynamicReading {
    pub number: i32,
    pub available_bike_stands: i32,
    pub available_bikes: i32,
    pub last_update: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WeatherObservation {
    pub dt: NaiveDateTime,
    pub main: String,
    pub description: String,
    pub temp: f64,
    pub wind_speed: f64,
    pub humidity: f64,
    pub icon: Option<String>,
}

/// Sorts snapshots alphabetically and keeps the first row for each name.
pub fn dedupe_by_name(mut snapshots: Vec<StationSnapshot>) -> Vec<StationSnapshot> {
    snapshots.sort_by(|a, b| a.name.cmp(&b.name));
    snapshots.dedup_by(|later, earlier| later.name == earlier.name);
    snapshots
}
