//! Integration tests for the bulk ingestion path
//!
//! A batch is processed in order; per-record failures do not abort it, and
//! a tag appearing twice in one batch is a duplicate against its first
//! occurrence.

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;
use wits_common::api::types::{BulkScanRequest, ScanOutcomeKind, ScanRequest};
use wits_common::EventBus;
use wits_si::config::EngineConfig;
use wits_si::db::catalog::{self, TagCatalogEntry};
use wits_si::db::locations::{self, LocationEntry};
use wits_si::engine::ScanPipeline;

async fn setup_pipeline() -> (tempfile::TempDir, Arc<ScanPipeline>) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = wits_common::db::init_database(&dir.path().join("wits.db"))
        .await
        .expect("Should initialize database");

    locations::save(
        &pool,
        &LocationEntry {
            location_code: "DOCK-01".to_string(),
            device_id: "DEVICE001".to_string(),
            location_name: "Receiving Dock 1".to_string(),
        },
    )
    .await
    .unwrap();

    for (epc, po, item) in [
        ("TAG-A", "PO-1", "ITEM-1"),
        ("TAG-B", "PO-1", "ITEM-2"),
        ("TAG-C", "PO-2", "ITEM-3"),
    ] {
        catalog::save(
            &pool,
            &TagCatalogEntry {
                epc: epc.to_string(),
                po_number: po.to_string(),
                item_number: item.to_string(),
                lot_number: None,
                ordered_quantity: 1.0,
                unit_of_measure: Some("EA".to_string()),
            },
        )
        .await
        .unwrap();
    }

    let events = Arc::new(EventBus::new(256));
    let pipeline = Arc::new(ScanPipeline::new(pool, events, EngineConfig::default()));
    (dir, pipeline)
}

fn batch(tags: &[&str]) -> BulkScanRequest {
    BulkScanRequest {
        scans: tags
            .iter()
            .map(|tag| ScanRequest::new(*tag, "DEVICE001"))
            .collect(),
        session_id: Some(Uuid::new_v4()),
    }
}

// =============================================================================
// Scenario B: in-batch duplicate
// =============================================================================

#[tokio::test]
async fn test_batch_with_repeated_tag_reports_duplicate() {
    let (_dir, pipeline) = setup_pipeline().await;

    let request = batch(&["TAG-A", "TAG-B", "TAG-A", "TAG-C"]);
    let response = pipeline.ingest_batch_at(&request, Utc::now()).await;

    assert_eq!(response.created, 3);
    assert_eq!(response.duplicates, 1);
    assert_eq!(response.errors, 0);
    assert_eq!(response.duplicate_tags, vec!["TAG-A".to_string()]);

    // Per-record outcomes in batch order
    assert_eq!(response.results.len(), 4);
    assert_eq!(response.results[0].outcome, ScanOutcomeKind::Toggled);
    assert_eq!(response.results[1].outcome, ScanOutcomeKind::Toggled);
    assert_eq!(response.results[2].outcome, ScanOutcomeKind::DuplicateSuppressed);
    assert_eq!(response.results[3].outcome, ScanOutcomeKind::Toggled);
}

// =============================================================================
// Per-record failures do not abort the batch
// =============================================================================

#[tokio::test]
async fn test_batch_continues_past_resolution_errors() {
    let (_dir, pipeline) = setup_pipeline().await;

    let mut request = batch(&["TAG-A", "TAG-B"]);
    // Second record points at an unconfigured reader
    request.scans[1].device_id = Some("DEVICE999".to_string());
    request.scans.push(ScanRequest::new("TAG-C", "DEVICE001"));

    let response = pipeline.ingest_batch_at(&request, Utc::now()).await;

    assert_eq!(response.created, 2);
    assert_eq!(response.errors, 1);
    assert_eq!(response.results.len(), 3);
    assert_eq!(response.results[1].outcome, ScanOutcomeKind::ResolutionError);
    assert!(response.results[1].message.contains("DEVICE999"));
    // The record after the failure was still processed
    assert_eq!(response.results[2].outcome, ScanOutcomeKind::Toggled);
}

// =============================================================================
// Cooldown no-ops are counted separately from duplicates
// =============================================================================

#[tokio::test]
async fn test_batch_counts_cooldown_ignores() {
    let (_dir, pipeline) = setup_pipeline().await;
    let t0 = Utc::now();

    // Prime the key with an accepted scan
    pipeline
        .process_scan_at(&ScanRequest::new("TAG-A", "DEVICE001"), t0)
        .await
        .unwrap();

    // Past the suppression window but inside the cooldown
    let request = batch(&["TAG-A", "TAG-B"]);
    let response = pipeline
        .ingest_batch_at(&request, t0 + Duration::seconds(5))
        .await;

    assert_eq!(response.created, 1);
    assert_eq!(response.ignored, 1);
    assert_eq!(response.duplicates, 0);
    assert_eq!(response.results[0].outcome, ScanOutcomeKind::IgnoredCooldown);
}

#[tokio::test]
async fn test_empty_batch_is_a_noop() {
    let (_dir, pipeline) = setup_pipeline().await;

    let response = pipeline
        .ingest_batch_at(
            &BulkScanRequest {
                scans: Vec::new(),
                session_id: None,
            },
            Utc::now(),
        )
        .await;

    assert_eq!(response.created, 0);
    assert_eq!(response.duplicates, 0);
    assert_eq!(response.errors, 0);
    assert!(response.results.is_empty());
}
