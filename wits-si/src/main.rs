//! Scan Ingest (wits-si) - Main entry point
//!
//! Receives tag-read events from fixed and handheld RFID readers, resolves
//! them against the catalog and location tables, and maintains the presence
//! ledger and live stock totals.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wits_common::EventBus;
use wits_si::config::EngineConfig;
use wits_si::engine::ScanPipeline;
use wits_si::{build_router, AppState};

/// Command-line arguments for wits-si
#[derive(Parser, Debug)]
#[command(name = "wits-si")]
#[command(about = "Scan Ingest microservice for WITS")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5730", env = "WITS_SI_PORT")]
    port: u16,

    /// Root folder containing the WITS database
    #[arg(short, long, env = "WITS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wits_si=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    info!(
        "Starting WITS Scan Ingest (wits-si) v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Root folder resolution: CLI > env > config file > platform default
    let cli_root = args.root_folder.as_ref().map(|p| p.to_string_lossy().to_string());
    let root_folder = wits_common::config::resolve_root_folder(
        cli_root.as_deref(),
        "WITS_ROOT_FOLDER",
        Some("root_folder"),
    )
    .context("Failed to resolve root folder")?;
    info!("Root folder: {}", root_folder.display());

    let db_path = wits_common::config::database_path(&root_folder)
        .context("Failed to prepare root folder")?;
    let pool = wits_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    // Engine windows are configuration constants in the settings table
    let engine_config = EngineConfig::load(&pool)
        .await
        .context("Failed to load engine configuration")?;
    info!(
        "Engine windows: cooldown {} ms, suppression {} ms",
        engine_config.toggle_cooldown.num_milliseconds(),
        engine_config.suppression_window.num_milliseconds()
    );

    let events = Arc::new(EventBus::new(1024));
    let pipeline = Arc::new(ScanPipeline::new(pool.clone(), events.clone(), engine_config));

    // Periodic duplicate-filter maintenance
    let sweeper = pipeline.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = sweeper.sweep_dedup(chrono::Utc::now());
            if removed > 0 {
                tracing::debug!("Duplicate filter sweep removed {} entries", removed);
            }
        }
    });

    // Build the application router
    let state = AppState::new(pipeline, events, pool);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("wits-si listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
