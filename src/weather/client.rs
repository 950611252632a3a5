use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::time::Duration;
use tracing::{debug, info};

use super::forecast::Forecast;
use crate::config::WeatherConfig;
use crate::error::WeatherError;

#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch_forecast(&self) -> Result<Forecast, WeatherError>;
}

/// OpenWeatherMap One Call client pinned to the configured coordinates.
#[derive(Clone)]
pub struct OpenWeatherClient {
    http_client: HttpClient,
    config: WeatherConfig,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        info!(
            "Weather client targeting lat={} lon={}",
            config.latitude, config.longitude
        );

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ForecastSource for OpenWeatherClient {
    async fn fetch_forecast(&self) -> Result<Forecast, WeatherError> {
        debug!("Requesting forecast from {}", self.config.base_url);

        let response = self
            .http_client
            .get(&self.config.base_url)
            .query(&[
                ("lat", self.config.latitude.to_string()),
                ("lon", self.config.longitude.to_string()),
                ("exclude", "current,minutely".to_string()),
                ("appid", self.config.api_key.clone()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WeatherError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.bytes().await?;
        let forecast: Forecast = serde_json::from_slice(&body)
            .map_err(|e| WeatherError::MalformedResponse(e.to_string()))?;

        debug!(
            "Forecast received: {} hourly, {} daily entries",
            forecast.hourly.len(),
            forecast.daily.len()
        );
        Ok(forecast)
    }
}
