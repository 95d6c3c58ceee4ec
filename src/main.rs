//! campusgate - WebSocket gateway for the campus record store
//!
//! Runs the record store and the browser-facing gateway in one process.

mod config;

use campusgate_gateway::Server;
use campusgate_store::{RecordStore, StoreServer};
use config::{Config, CONFIG_ENV, WRITE_CONFIG_ENV};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if CAMPUSGATE_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var(CONFIG_ENV) {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // If a config file was explicitly specified, fail on error
            if std::env::var(CONFIG_ENV).is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::info!("Using default configuration");
            Config::from_env()
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return Err(e.into());
    }

    // Write the effective configuration and exit if asked to
    if let Ok(path) = std::env::var(WRITE_CONFIG_ENV) {
        config.save(&path)?;
        tracing::info!("Wrote configuration to {}", path);
        return Ok(());
    }

    tracing::info!("Starting campusgate");
    tracing::info!("  Gateway address: {}", config.gateway.bind_addr);
    tracing::info!("  Backend address: {}", config.gateway.backend_addr);
    tracing::info!("  Store address: {}", config.store.bind_addr);
    tracing::info!(
        "  Limits: {} clients, {} backend connections, {} byte frames",
        config.gateway.max_connections,
        config.gateway.max_backend_connections,
        config.gateway.max_frame_bytes
    );

    let store = if config.store.seed {
        tracing::info!("  Store: seeded with sample records");
        RecordStore::seeded()
    } else {
        tracing::info!("  Store: empty");
        RecordStore::new()
    };
    let store_server = Arc::new(StoreServer::new(config.store.clone(), Arc::new(store)));
    let gateway = Arc::new(Server::new(config.gateway.clone()));

    // Spawn the record store
    let store_handle = {
        let server = store_server.clone();
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                tracing::error!("Record store failed: {}", e);
            }
        })
    };

    // Spawn shutdown signal handler
    let shutdown_gateway = gateway.clone();
    let shutdown_store = store_server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping servers...");
        shutdown_gateway.shutdown();
        shutdown_store.shutdown();
    });

    // Run gateway (blocks until shutdown)
    let result = gateway.run().await;

    store_server.shutdown();
    let _ = store_handle.await;

    let stats = gateway.stats();
    tracing::info!(
        "Gateway stopped: {} connections, {} messages, {} errors",
        stats
            .connections_total
            .load(std::sync::atomic::Ordering::Relaxed),
        stats.messages_total.load(std::sync::atomic::Ordering::Relaxed),
        stats.errors_total.load(std::sync::atomic::Ordering::Relaxed)
    );

    result.map_err(Into::into)
}
