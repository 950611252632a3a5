use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

use crate::db::DynamicReading;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyOccupancy {
    pub number: i32,
    pub day: String,
    #[serde(rename = "avgStands")]
    pub avg_stands: i64,
    #[serde(rename = "avgBikes")]
    pub avg_bikes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyOccupancy {
    pub number: i32,
    pub last_update: NaiveDateTime,
    pub available_bike_stands: f64,
    pub available_bikes: f64,
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn means(readings: &[&DynamicReading]) -> (f64, f64) {
    let stands = readings
        .iter()
        .map(|r| r.available_bike_stands as f64)
        .mean();
    let bikes = readings.iter().map(|r| r.available_bikes as f64).mean();
    (stands, bikes)
}

/// Averages per weekday, Monday first. Days with no readings are omitted.
pub fn daily_averages(station_id: i32, readings: &[DynamicReading]) -> Vec<DailyOccupancy> {
    let mut by_weekday: BTreeMap<u32, Vec<&DynamicReading>> = BTreeMap::new();
    for reading in readings {
        by_weekday
            .entry(reading.last_update.weekday().num_days_from_monday())
            .or_default()
            .push(reading);
    }

    by_weekday
        .into_values()
        .map(|group| {
            let (stands, bikes) = means(&group);
            DailyOccupancy {
                number: station_id,
                day: group[0].last_update.format("%A").to_string(),
                avg_stands: round_half_up(stands),
                avg_bikes: round_half_up(bikes),
            }
        })
        .collect()
}

/// Averages per clock hour, oldest bucket first.
pub fn hourly_averages(station_id: i32, readings: &[DynamicReading]) -> Vec<HourlyOccupancy> {
    let mut by_hour: BTreeMap<NaiveDateTime, Vec<&DynamicReading>> = BTreeMap::new();
    for reading in readings {
        let bucket = reading
            .last_update
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0));
        if let Some(bucket) = bucket {
            by_hour.entry(bucket).or_default().push(reading);
        }
    }

    by_hour
        .into_iter()
        .map(|(bucket, group)| {
            let (stands, bikes) = means(&group);
            HourlyOccupancy {
                number: station_id,
                last_update: bucket,
                available_bike_stands: stands,
                available_bikes: bikes,
            }
        })
        .collect()
}
