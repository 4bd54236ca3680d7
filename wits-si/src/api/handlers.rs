//! HTTP request handlers
//!
//! Implements the scan submission and dashboard read endpoints. Cooldown
//! and duplicate outcomes map to 200 with an explanatory message (they are
//! not error states from the caller's perspective); resolution errors map
//! to 4xx, persistence failures to 503 so the operator knows the scan was
//! not recorded and can retry.

use crate::db::presence::{self, PresenceRecord};
use crate::engine::aggregate::StockSnapshot;
use crate::engine::{error_to_response, outcome_to_response, ScanOutcome};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;
use wits_common::api::types::{BulkScanRequest, ScanRequest, ScanResponse};
use wits_common::{Error, PresenceStatus};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

/// Wire form of a presence record (dashboard read projection)
#[derive(Debug, Serialize)]
pub struct PresenceRecordInfo {
    id: Uuid,
    epc: String,
    location_code: String,
    po_number: String,
    item_number: String,
    lot_number: Option<String>,
    quantity: f64,
    status: PresenceStatus,
    last_transition_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<PresenceRecord> for PresenceRecordInfo {
    fn from(record: PresenceRecord) -> Self {
        Self {
            id: record.id,
            epc: record.key.epc,
            location_code: record.key.location_code,
            po_number: record.key.po_number,
            item_number: record.key.item_number,
            lot_number: record.lot_number,
            quantity: record.quantity,
            status: record.status,
            last_transition_at: record.last_transition_at,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    epc: String,
    records: Vec<PresenceRecordInfo>,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateCacheRequest {
    /// "catalog", "locations" or "all" (default)
    #[serde(default)]
    scope: Option<String>,
    /// Invalidate a single catalog entry
    #[serde(default)]
    epc: Option<String>,
    /// Invalidate a single device mapping
    #[serde(default)]
    device_id: Option<String>,
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "wits-si".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Scan Submission Endpoints
// ============================================================================

/// Map a processing error to its HTTP status
fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::UnknownDevice { .. } | Error::UnknownTag { .. } | Error::NotFound(_) => {
            StatusCode::NOT_FOUND
        }
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /api/v1/scan - Submit a single tag read
pub async fn submit_scan(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> (StatusCode, Json<ScanResponse>) {
    match state.pipeline.process_scan(&request).await {
        Ok(outcome) => {
            let status = match &outcome {
                ScanOutcome::Toggled {
                    old_status: None, ..
                } => StatusCode::CREATED,
                _ => StatusCode::OK,
            };
            (status, Json(outcome_to_response(&outcome)))
        }
        Err(e) => {
            error!("Scan processing failed for tag {}: {}", request.tag_id, e);
            (error_status(&e), Json(error_to_response(&e)))
        }
    }
}

/// POST /api/v1/scan/bulk - Submit an ordered batch of tag reads
///
/// Per-record failures do not abort the batch, so the response is always
/// 200 with per-record outcomes and aggregate counts.
pub async fn submit_bulk(
    State(state): State<AppState>,
    Json(request): Json<BulkScanRequest>,
) -> Json<wits_common::api::types::BulkScanResponse> {
    Json(state.pipeline.ingest_batch(&request).await)
}

// ============================================================================
// Dashboard Read Projections
// ============================================================================

/// GET /api/v1/stock - Current aggregate stock snapshot
pub async fn get_stock(State(state): State<AppState>) -> Json<StockSnapshot> {
    Json(state.pipeline.aggregator().snapshot())
}

/// POST /api/v1/stock/recompute - Rebuild totals from the presence ledger
///
/// Recovery path when the incremental totals are suspected corrupted.
pub async fn recompute_stock(
    State(state): State<AppState>,
) -> Result<Json<StockSnapshot>, (StatusCode, Json<StatusResponse>)> {
    match state.pipeline.aggregator().recompute(&state.db).await {
        Ok(snapshot) => {
            info!("Stock totals recomputed from presence ledger");
            Ok(Json(snapshot))
        }
        Err(e) => {
            error!("Stock recompute failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse {
                    status: format!("error: {}", e),
                }),
            ))
        }
    }
}

/// GET /api/v1/presence/:epc - Current presence records for a tag
pub async fn get_presence(
    State(state): State<AppState>,
    Path(epc): Path<String>,
) -> Result<Json<PresenceResponse>, (StatusCode, Json<StatusResponse>)> {
    match presence::list_by_epc(&state.db, &epc).await {
        Ok(records) => Ok(Json(PresenceResponse {
            epc,
            records: records.into_iter().map(PresenceRecordInfo::from).collect(),
        })),
        Err(e) => {
            error!("Presence lookup failed for tag {}: {}", epc, e);
            Err((
                error_status(&e),
                Json(StatusResponse {
                    status: format!("error: {}", e),
                }),
            ))
        }
    }
}

// ============================================================================
// Administrative Endpoints
// ============================================================================

/// POST /api/v1/cache/invalidate - Resolver cache invalidation hook
///
/// Called by the external CRUD system after catalog or location updates.
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Json(request): Json<InvalidateCacheRequest>,
) -> Json<StatusResponse> {
    if let Some(epc) = &request.epc {
        state.pipeline.catalog().invalidate(epc).await;
        info!("Invalidated catalog cache entry for tag {}", epc);
        return Json(StatusResponse {
            status: "ok".to_string(),
        });
    }
    if let Some(device_id) = &request.device_id {
        state.pipeline.locations().invalidate_device(device_id).await;
        info!("Invalidated location cache entry for device {}", device_id);
        return Json(StatusResponse {
            status: "ok".to_string(),
        });
    }

    match request.scope.as_deref() {
        Some("catalog") => state.pipeline.catalog().invalidate_all().await,
        Some("locations") => state.pipeline.locations().invalidate_all().await,
        _ => {
            state.pipeline.catalog().invalidate_all().await;
            state.pipeline.locations().invalidate_all().await;
        }
    }
    info!(
        "Invalidated resolver caches (scope: {})",
        request.scope.as_deref().unwrap_or("all")
    );
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}
