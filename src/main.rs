use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod ml;
mod occupancy;
mod weather;
mod web;

#[cfg(test)]
mod testing;

use crate::config::Config;
use crate::db::{MySqlStationStore, StationStore};
use crate::ml::{FeatureSchemas, ModelRegistry, PredictionEngine};
use crate::weather::OpenWeatherClient;
use crate::web::{ApiServer, ResponseCache};

#[derive(Parser)]
#[command(name = "wheelie-good")]
#[command(about = "Dublin bike-share stations, weather and availability predictions")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Overrides `server.port` from the config file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting wheelie-good with config {}", cli.config);

    let store: Arc<dyn StationStore> = Arc::new(MySqlStationStore::new(&config.database).await?);
    let forecast = Arc::new(OpenWeatherClient::new(&config.weather)?);

    let registry = Arc::new(ModelRegistry::new(
        &config.models.directory,
        FeatureSchemas::from_config(&config.models),
    ));
    if config.models.eager_load {
        registry.preload().await?;
    }

    let engine = Arc::new(PredictionEngine::new(
        store.clone(),
        forecast,
        registry,
    ));
    let cache = Arc::new(ResponseCache::new(Duration::from_secs(
        config.cache.ttl_seconds,
    )));

    let server = ApiServer::new(
        store,
        engine,
        cache,
        config.occupancy.clone(),
        config.server.static_dir.clone(),
    );

    let port = cli.port.unwrap_or(config.server.port);
    server
        .start(&config.server.host, port, async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, stopping server...");
        })
        .await?;

    Ok(())
}
