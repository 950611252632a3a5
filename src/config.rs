use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::ml::features::Feature;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub weather: WeatherConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub occupancy: OccupancyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: "static".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u64,
}

/// Where model artifacts live and the feature layout each granularity expects.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelsConfig {
    pub directory: String,
    #[serde(default)]
    pub eager_load: bool,
    #[serde(default = "default_hourly_features")]
    pub hourly_features: Vec<Feature>,
    #[serde(default = "default_daily_features")]
    pub daily_features: Vec<Feature>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            directory: "models".to_string(),
            eager_load: false,
            hourly_features: default_hourly_features(),
            daily_features: default_daily_features(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 300 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OccupancyConfig {
    pub hourly_window_hours: i64,
    pub daily_window_days: i64,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            hourly_window_hours: 24,
            daily_window_days: 28,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5/onecall".to_string()
}

// Dublin city centre
fn default_latitude() -> f64 {
    53.33306
}

fn default_longitude() -> f64 {
    -6.24889
}

fn default_weather_timeout() -> u64 {
    30
}

pub fn default_hourly_features() -> Vec<Feature> {
    vec![
        Feature::Temp,
        Feature::WindSpeed,
        Feature::Humidity,
        Feature::Clouds,
        Feature::Clear,
        Feature::Snow,
        Feature::Rain,
        Feature::Drizzle,
        Feature::Thunderstorm,
        Feature::Hour,
        Feature::Day,
    ]
}

pub fn default_daily_features() -> Vec<Feature> {
    default_hourly_features()
        .into_iter()
        .filter(|feature| *feature != Feature::Hour)
        .collect()
}

impl Config {
    /// Reads the TOML file at `path`, then applies `WHEELIE__SECTION__KEY`
    /// environment overrides on top.
    pub fn from_file(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("WHEELIE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}
