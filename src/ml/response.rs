use serde::Serialize;

use super::features::WeatherSnapshot;
use crate::db::StaticStation;

/// Body of `/model/:station_id/:hour/:day`. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predicted_bikes: i32,
    pub weather: String,
    pub temp: f64,
    pub wind_speed: f64,
    pub humidity: f64,
    pub station_name: String,
    pub predicted_available_stands: i32,
    pub icon: String,
}

/// Truncates a raw model output to a whole number of bikes the station can hold.
pub fn bike_count(raw: f64, capacity: i32) -> i32 {
    (raw.trunc() as i32).clamp(0, capacity.max(0))
}

pub fn assemble(
    predicted_bikes: i32,
    snapshot: &WeatherSnapshot,
    station: &StaticStation,
) -> PredictionResult {
    PredictionResult {
        predicted_bikes,
        weather: snapshot.condition.clone(),
        temp: snapshot.temp,
        wind_speed: snapshot.wind_speed,
        humidity: snapshot.humidity,
        station_name: station.name.clone(),
        predicted_available_stands: station.bike_stands - predicted_bikes,
        icon: snapshot.icon.clone(),
    }
}
