//! Integration tests for wits-si API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Single scan submission (status codes and outcome mapping)
//! - Bulk submission summary
//! - Stock snapshot and recompute projections
//! - Per-tag presence projection
//! - Cache invalidation hook

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method
use wits_common::EventBus;
use wits_si::config::EngineConfig;
use wits_si::db::catalog::{self, TagCatalogEntry};
use wits_si::db::locations::{self, LocationEntry};
use wits_si::engine::ScanPipeline;
use wits_si::{build_router, AppState};

/// Test helper: fresh database with one location and one catalog entry
async fn setup_app() -> (tempfile::TempDir, axum::Router) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = wits_common::db::init_database(&dir.path().join("wits.db"))
        .await
        .expect("Should initialize database");

    locations::save(
        &pool,
        &LocationEntry {
            location_code: "DOCK-02".to_string(),
            device_id: "DEVICE002".to_string(),
            location_name: "Receiving Dock 2".to_string(),
        },
    )
    .await
    .unwrap();

    catalog::save(
        &pool,
        &TagCatalogEntry {
            epc: "QUICK123".to_string(),
            po_number: "PO-1000".to_string(),
            item_number: "ITEM-100".to_string(),
            lot_number: Some("LOT-7".to_string()),
            ordered_quantity: 10.0,
            unit_of_measure: Some("EA".to_string()),
        },
    )
    .await
    .unwrap();

    let events = Arc::new(EventBus::new(256));
    let pipeline = Arc::new(ScanPipeline::new(
        pool.clone(),
        events.clone(),
        EngineConfig::default(),
    ));
    let state = AppState::new(pipeline, events, pool);
    (dir, build_router(state))
}

/// Test helper: build a JSON POST request
fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: build a GET request
fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = setup_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "wits-si");
    assert!(body["version"].is_string());
}

// =============================================================================
// Scan Submission Tests
// =============================================================================

#[tokio::test]
async fn test_first_scan_returns_created_with_status_in() {
    let (_dir, app) = setup_app().await;

    let request = post_json(
        "/api/v1/scan",
        json!({"tag_id": "QUICK123", "device_id": "DEVICE002"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["accepted"], true);
    assert_eq!(body["outcome"], "toggled");
    assert_eq!(body["status"], "in");
}

#[tokio::test]
async fn test_immediate_repeat_is_suppressed_not_an_error() {
    let (_dir, app) = setup_app().await;
    let scan = json!({"tag_id": "QUICK123", "device_id": "DEVICE002"});

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/scan", scan.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Second submission lands inside the suppression window
    let response = app
        .oneshot(post_json("/api/v1/scan", scan))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["accepted"], false);
    assert_eq!(body["outcome"], "duplicate_suppressed");
    assert_eq!(body["status"], "in");
}

#[tokio::test]
async fn test_unknown_device_returns_resolution_error() {
    let (_dir, app) = setup_app().await;

    let request = post_json(
        "/api/v1/scan",
        json!({"tag_id": "QUICK123", "device_id": "DEVICE404"}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"], "resolution_error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("No location configured for device DEVICE404"));
}

#[tokio::test]
async fn test_missing_device_and_key_is_bad_request() {
    let (_dir, app) = setup_app().await;

    let request = post_json("/api/v1/scan", json!({"tag_id": "QUICK123"}));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Bulk Submission Tests
// =============================================================================

#[tokio::test]
async fn test_bulk_submission_summary() {
    let (_dir, app) = setup_app().await;

    let request = post_json(
        "/api/v1/scan/bulk",
        json!({
            "scans": [
                {"tag_id": "QUICK123", "device_id": "DEVICE002"},
                {"tag_id": "QUICK123", "device_id": "DEVICE002"},
                {"tag_id": "QUICK123", "device_id": "DEVICE404"}
            ]
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["created"], 1);
    assert_eq!(body["duplicates"], 1);
    assert_eq!(body["errors"], 1);
    assert_eq!(body["duplicate_tags"], json!(["QUICK123"]));
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
}

// =============================================================================
// Dashboard Projection Tests
// =============================================================================

#[tokio::test]
async fn test_stock_snapshot_after_scan() {
    let (_dir, app) = setup_app().await;

    app.clone()
        .oneshot(post_json(
            "/api/v1/scan",
            json!({"tag_id": "QUICK123", "device_id": "DEVICE002"}),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get("/api/v1/stock")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["stats"]["distinct_items"], 1);
    assert_eq!(body["stats"]["distinct_pos"], 1);
    assert_eq!(body["stats"]["total_on_hand"], 10.0);
    assert_eq!(body["summary"][0]["item_number"], "ITEM-100");
    assert_eq!(body["summary"][0]["net_quantity"], 10.0);
    assert!(body["last_updated"].is_string());
}

#[tokio::test]
async fn test_stock_recompute_returns_snapshot() {
    let (_dir, app) = setup_app().await;

    app.clone()
        .oneshot(post_json(
            "/api/v1/scan",
            json!({"tag_id": "QUICK123", "device_id": "DEVICE002"}),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json("/api/v1/stock/recompute", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["stats"]["total_on_hand"], 10.0);
}

#[tokio::test]
async fn test_presence_projection_for_tag() {
    let (_dir, app) = setup_app().await;

    app.clone()
        .oneshot(post_json(
            "/api/v1/scan",
            json!({"tag_id": "QUICK123", "device_id": "DEVICE002"}),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get("/api/v1/presence/QUICK123")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["epc"], "QUICK123");
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "in");
    assert_eq!(records[0]["location_code"], "DOCK-02");
    assert_eq!(records[0]["po_number"], "PO-1000");
}

#[tokio::test]
async fn test_presence_projection_unknown_tag_is_empty() {
    let (_dir, app) = setup_app().await;

    let response = app.oneshot(get("/api/v1/presence/NOSUCHTAG")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["records"].as_array().unwrap().is_empty());
}

// =============================================================================
// Cache Invalidation Tests
// =============================================================================

#[tokio::test]
async fn test_cache_invalidation_hook() {
    let (_dir, app) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/cache/invalidate",
            json!({"epc": "QUICK123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");

    let response = app
        .oneshot(post_json("/api/v1/cache/invalidate", json!({"scope": "all"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
