use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use super::cache::{CachedJson, ResponseCache};
use crate::config::OccupancyConfig;
use crate::db::{models::dedupe_by_name, StationStore};
use crate::error::ApiError;
use crate::ml::{PredictionEngine, PredictionResult};
use crate::occupancy::{daily_averages, hourly_averages};

#[derive(Clone)]
pub struct ApiServer {
    store: Arc<dyn StationStore>,
    engine: Arc<PredictionEngine>,
    cache: Arc<ResponseCache>,
    occupancy: OccupancyConfig,
    static_dir: String,
}

impl ApiServer {
    pub fn new(
        store: Arc<dyn StationStore>,
        engine: Arc<PredictionEngine>,
        cache: Arc<ResponseCache>,
        occupancy: OccupancyConfig,
        static_dir: String,
    ) -> Self {
        Self {
            store,
            engine,
            cache,
            occupancy,
            static_dir,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(serve_index))
            .route("/about", get(serve_about))
            .route("/contact", get(serve_contact))
            .route("/RoutePlanner.html", get(serve_route_planner))
            .route("/currentBikes", get(current_bikes))
            .route("/staticBikes", get(static_bikes))
            .route("/allBikes", get(all_bikes))
            .route("/weather", get(weather))
            .route("/occupancy/:station_id", get(occupancy))
            .route("/occupancyHourly/:station_id", get(occupancy_hourly))
            .route("/model/:station_id/:hour/:day", get(model_prediction))
            .route("/cache/invalidate", post(invalidate_cache))
            .nest_service("/static", ServeDir::new(&self.static_dir))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    pub async fn start(
        &self,
        host: &str,
        port: u16,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
        info!("Server listening on http://{}:{}", host, port);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

// Pages
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

async fn serve_about() -> Html<&'static str> {
    Html(include_str!("../../static/about.html"))
}

async fn serve_contact() -> Html<&'static str> {
    Html(include_str!("../../static/contact.html"))
}

async fn serve_route_planner() -> Html<&'static str> {
    Html(include_str!("../../static/RoutePlanner.html"))
}

// Listings
async fn current_bikes(State(server): State<ApiServer>) -> Result<CachedJson, ApiError> {
    server
        .cache
        .get_or_load("currentBikes", || server.store.latest_readings())
        .await
}

async fn static_bikes(State(server): State<ApiServer>) -> Result<CachedJson, ApiError> {
    server
        .cache
        .get_or_load("staticBikes", || server.store.static_stations())
        .await
}

async fn all_bikes(State(server): State<ApiServer>) -> Result<CachedJson, ApiError> {
    server
        .cache
        .get_or_load("allBikes", || async {
            server.store.station_snapshots().await.map(dedupe_by_name)
        })
        .await
}

async fn weather(State(server): State<ApiServer>) -> Result<CachedJson, ApiError> {
    server
        .cache
        .get_or_load("weather", || server.store.recent_weather())
        .await
}

async fn occupancy(
    State(server): State<ApiServer>,
    Path(station_id): Path<i32>,
) -> Result<CachedJson, ApiError> {
    let since = Utc::now().naive_utc() - Duration::days(server.occupancy.daily_window_days);
    server
        .cache
        .get_or_load(&format!("occupancy/{}", station_id), || async {
            let readings = server.store.readings_since(station_id, since).await?;
            Ok::<_, ApiError>(daily_averages(station_id, &readings))
        })
        .await
}

async fn occupancy_hourly(
    State(server): State<ApiServer>,
    Path(station_id): Path<i32>,
) -> Result<CachedJson, ApiError> {
    let since = Utc::now().naive_utc() - Duration::hours(server.occupancy.hourly_window_hours);
    server
        .cache
        .get_or_load(&format!("occupancyHourly/{}", station_id), || async {
            let readings = server.store.readings_since(station_id, since).await?;
            Ok::<_, ApiError>(hourly_averages(station_id, &readings))
        })
        .await
}

// Prediction
async fn model_prediction(
    State(server): State<ApiServer>,
    Path((station_id, hour, day)): Path<(i32, u32, u32)>,
) -> Result<Json<PredictionResult>, ApiError> {
    let result = server.engine.predict(station_id, hour, day).await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct InvalidateParams {
    key: Option<String>,
}

async fn invalidate_cache(
    State(server): State<ApiServer>,
    Query(params): Query<InvalidateParams>,
) -> impl IntoResponse {
    match params.key {
        Some(key) => {
            if server.cache.invalidate(&key) {
                info!("Invalidated cached listing {}", key);
            }
        }
        None => {
            let dropped = server.cache.invalidate_all();
            info!("Invalidated {} cached listings", dropped);
        }
    }
    StatusCode::NO_CONTENT
}
