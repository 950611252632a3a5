use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

use super::models::{
    DynamicReading, LatestReading, StaticStation, StationSnapshot, WeatherObservation,
};
use crate::config::DatabaseConfig;
use crate::error::StoreError;

const STATION_LIMIT: i64 = 200;
const WEATHER_LIMIT: i64 = 100;

/// Read-only access to the bike and weather tables.
#[async_trait]
pub trait StationStore: Send + Sync {
    /// All stations, alphabetical by name.
    async fn static_stations(&self) -> Result<Vec<StaticStation>, StoreError>;

    async fn station(&self, station_id: i32) -> Result<Option<StaticStation>, StoreError>;

    /// Latest reading per station, ordered by station number.
    async fn latest_readings(&self) -> Result<Vec<LatestReading>, StoreError>;

    /// Stations joined with their latest reading.
    async fn station_snapshots(&self) -> Result<Vec<StationSnapshot>, StoreError>;

    /// Observed weather, most recent first.
    async fn recent_weather(&self) -> Result<Vec<WeatherObservation>, StoreError>;

    /// Readings for one station at or after `since`, oldest first.
    async fn readings_since(
        &self,
        station_id: i32,
        since: NaiveDateTime,
    ) -> Result<Vec<DynamicReading>, StoreError>;
}

pub struct MySqlStationStore {
    pool: MySqlPool,
}

impl MySqlStationStore {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!(
            "Database pool ready ({} connections max)",
            config.max_connections
        );
        Ok(Self { pool })
    }
}

#[async_trait]
impl StationStore for MySqlStationStore {
    async fn static_stations(&self) -> Result<Vec<StaticStation>, StoreError> {
        debug!("Querying static stations");
        let rows = sqlx::query_as::<_, StaticStation>(
            "SELECT number, name, address, pos_lat, pos_lng, bike_stands
             FROM static_bikes
             ORDER BY name ASC
             LIMIT ?",
        )
        .bind(STATION_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn station(&self, station_id: i32) -> Result<Option<StaticStation>, StoreError> {
        let row = sqlx::query_as::<_, StaticStation>(
            "SELECT number, name, address, pos_lat, pos_lng, bike_stands
             FROM static_bikes
             WHERE number = ?",
        )
        .bind(station_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn latest_readings(&self) -> Result<Vec<LatestReading>, StoreError> {
        debug!("Querying latest dynamic readings");
        let rows = sqlx::query_as::<_, LatestReading>(
            "SELECT d.number, d.available_bike_stands, d.available_bikes, d.last_update
             FROM dynamic_bikes d
             INNER JOIN (
                 SELECT number, MAX(last_update) AS last_update
                 FROM dynamic_bikes
                 GROUP BY number
             ) latest ON d.number = latest.number AND d.last_update = latest.last_update
             ORDER BY d.number ASC
             LIMIT ?",
        )
        .bind(STATION_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn station_snapshots(&self) -> Result<Vec<StationSnapshot>, StoreError> {
        debug!("Querying station snapshots");
        let rows = sqlx::query_as::<_, StationSnapshot>(
            "SELECT d.number, d.available_bike_stands, d.available_bikes, d.last_update,
                    s.name, s.address, s.pos_lat, s.pos_lng, s.bike_stands
             FROM dynamic_bikes d
             INNER JOIN (
                 SELECT number, MAX(last_update) AS last_update
                 FROM dynamic_bikes
                 GROUP BY number
             ) latest ON d.number = latest.number AND d.last_update = latest.last_update
             INNER JOIN static_bikes s ON d.number = s.number
             ORDER BY s.name ASC
             LIMIT ?",
        )
        .bind(STATION_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn recent_weather(&self) -> Result<Vec<WeatherObservation>, StoreError> {
        debug!("Querying observed weather");
        let rows = sqlx::query_as::<_, WeatherObservation>(
            "SELECT dt, main, description, temp, wind_speed, humidity, icon
             FROM weather
             ORDER BY dt DESC
             LIMIT ?",
        )
        .bind(WEATHER_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn readings_since(
        &self,
        station_id: i32,
        since: NaiveDateTime,
    ) -> Result<Vec<DynamicReading>, StoreError> {
        debug!("Querying readings for station {} since {}", station_id, since);
        let rows = sqlx::query_as::<_, DynamicReading>(
            "SELECT number, available_bike_stands, available_bikes, last_update
             FROM dynamic_bikes
             WHERE number = ? AND last_update >= ?
             ORDER BY last_update ASC",
        )
        .bind(station_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
