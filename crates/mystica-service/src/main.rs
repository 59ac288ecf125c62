//! Mystica Service - HTTP API for the Mystica economy
//!
//! This is the main entry point for the mystica service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mystica_economy::Catalog;
use mystica_service::{create_router, AppState, ServiceConfig};
use mystica_store::Store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mystica=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mystica Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        catalog_path = ?config.catalog_path,
        instant_loot_level = config.economy.instant_loot_level,
        "Service configuration loaded"
    );

    let store = open_store(&config)?;

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => {
            tracing::warn!("CATALOG_PATH not set - starting with an empty catalog");
            Catalog::empty()
        }
    };

    // Build app state
    let state = AppState::new(store, Arc::new(catalog), config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "rocksdb-backend")]
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    Ok(Arc::new(mystica_store::RocksStore::open(&config.data_dir)?))
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_store(_config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    tracing::warn!("Built without rocksdb-backend - balances are kept in memory only");
    Ok(Arc::new(mystica_store::MemoryStore::new()))
}
