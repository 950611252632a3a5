use std::sync::Arc;
use tracing::{debug, info};

use super::features::{reformat, ForecastTarget};
use super::registry::ModelRegistry;
use super::response::{assemble, bike_count, PredictionResult};
use crate::db::StationStore;
use crate::error::ApiError;
use crate::weather::ForecastSource;

/// Answers "how many bikes will station N have at this hour on that day".
pub struct PredictionEngine {
    store: Arc<dyn StationStore>,
    forecast: Arc<dyn ForecastSource>,
    registry: Arc<ModelRegistry>,
}

impl PredictionEngine {
    pub fn new(
        store: Arc<dyn StationStore>,
        forecast: Arc<dyn ForecastSource>,
        registry: Arc<ModelRegistry>,
    ) -> Self {
        info!("Prediction engine initialized");

        Self {
            store,
            forecast,
            registry,
        }
    }

    pub async fn predict(
        &self,
        station_id: i32,
        hour: u32,
        day: u32,
    ) -> Result<PredictionResult, ApiError> {
        let target = ForecastTarget::new(hour, day)?;

        let station = self
            .store
            .station(station_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No station {}", station_id)))?;

        let forecast = self.forecast.fetch_forecast().await?;

        let reformatted = reformat(&forecast, target, self.registry.schemas()).ok_or_else(|| {
            ApiError::NotFound(format!("No forecast covers day {} hour {}", day, hour))
        })?;

        let model = self
            .registry
            .get(station_id, reformatted.features.granularity)
            .await?;
        let raw = model.predict(&reformatted.features.values)?;
        let predicted_bikes = bike_count(raw, station.bike_stands);

        debug!(
            "Station {} day {} hour {}: {} model predicted {:.2} -> {} bikes",
            station_id,
            day,
            hour,
            reformatted.features.granularity,
            raw,
            predicted_bikes
        );

        Ok(assemble(predicted_bikes, &reformatted.snapshot, &station))
    }
}
