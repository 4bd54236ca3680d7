//! wits-si library - Scan Ingest module
//!
//! Receives raw tag-read events from fixed and handheld readers, resolves
//! them to warehouse locations and purchase-order lines, and maintains the
//! per-key presence ledger plus live stock totals.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use wits_common::EventBus;

pub mod api;
pub mod config;
pub mod db;
pub mod engine;

use engine::ScanPipeline;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The ingestion engine
    pub pipeline: Arc<ScanPipeline>,
    /// Event bus shared with the pipeline (SSE fan-out)
    pub events: Arc<EventBus>,
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    /// Create new application state
    pub fn new(pipeline: Arc<ScanPipeline>, events: Arc<EventBus>, db: SqlitePool) -> Self {
        Self {
            pipeline,
            events,
            db,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", get(api::health))
        .nest(
            "/api/v1",
            Router::new()
                // Scan submission
                .route("/scan", post(api::submit_scan))
                .route("/scan/bulk", post(api::submit_bulk))
                // Dashboard read projections
                .route("/stock", get(api::get_stock))
                .route("/stock/recompute", post(api::recompute_stock))
                .route("/presence/:epc", get(api::get_presence))
                // Administrative cache invalidation hook
                .route("/cache/invalidate", post(api::invalidate_cache))
                // SSE events
                .route("/events", get(api::event_stream)),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
