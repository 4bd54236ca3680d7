//! Scan ingestion engine
//!
//! Data flow: raw scan → resolver lookups → duplicate filter → presence
//! toggle → (on accepted transition) event sink + stock aggregator update.
//! Resolution happens before the per-key critical section so misconfigured
//! scans fail fast; the critical section covers the duplicate-filter
//! check-and-update and the toggle read-decide-write.

pub mod aggregate;
pub mod catalog;
pub mod dedup;
pub mod location;
pub mod locks;
pub mod toggle;

use crate::config::EngineConfig;
use crate::db::presence::{self, PresenceKey, PresenceRecord};
use aggregate::{StockAggregator, StockKey};
use catalog::CatalogResolver;
use chrono::{DateTime, Utc};
use dedup::DuplicateFilter;
use location::LocationResolver;
use locks::KeyLocks;
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use toggle::ToggleDecision;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wits_common::api::types::{BulkScanRequest, BulkScanResponse, ScanOutcomeKind, ScanRequest, ScanResponse};
use wits_common::{Error, EventBus, PresenceStatus, Result, WitsEvent};

/// Result of processing one accepted-or-acknowledged scan
///
/// Cooldown-ignored and duplicate-suppressed are outcomes, not errors:
/// resolution and persistence failures use the error channel instead.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// Presence state was created (old_status None) or flipped
    Toggled {
        record: PresenceRecord,
        old_status: Option<PresenceStatus>,
    },
    /// Scan acknowledged but inside the toggle cooldown; state unchanged
    IgnoredCooldown {
        record: PresenceRecord,
        remaining_ms: i64,
    },
    /// Scan suppressed by the duplicate filter before any state check
    DuplicateSuppressed { status: Option<PresenceStatus> },
}

/// A scan resolved to its presence key and quantity
struct ResolvedScan {
    key: PresenceKey,
    lot_number: Option<String>,
    quantity: f64,
}

/// The ingestion engine: resolvers, duplicate filter, toggle state machine,
/// aggregator and event fan-out, wired by the composition root
pub struct ScanPipeline {
    db: SqlitePool,
    catalog: CatalogResolver,
    locations: LocationResolver,
    dedup: DuplicateFilter,
    locks: KeyLocks,
    aggregator: StockAggregator,
    events: Arc<EventBus>,
    config: EngineConfig,
}

impl ScanPipeline {
    pub fn new(db: SqlitePool, events: Arc<EventBus>, config: EngineConfig) -> Self {
        Self {
            catalog: CatalogResolver::new(db.clone()),
            locations: LocationResolver::new(db.clone()),
            dedup: DuplicateFilter::new(config.suppression_window),
            locks: KeyLocks::default(),
            aggregator: StockAggregator::new(),
            events,
            config,
            db,
        }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn catalog(&self) -> &CatalogResolver {
        &self.catalog
    }

    pub fn locations(&self) -> &LocationResolver {
        &self.locations
    }

    pub fn aggregator(&self) -> &StockAggregator {
        &self.aggregator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drop expired duplicate-filter entries (periodic maintenance)
    pub fn sweep_dedup(&self, now: DateTime<Utc>) -> usize {
        self.dedup.sweep(now)
    }

    /// Process a single scan at the current server time
    pub async fn process_scan(&self, req: &ScanRequest) -> Result<ScanOutcome> {
        self.process_scan_at(req, Utc::now()).await
    }

    /// Process a single scan at an explicit ingestion time
    ///
    /// Both windows are evaluated against the server-assigned ingestion
    /// time; the device timestamp on the request is advisory only.
    pub async fn process_scan_at(
        &self,
        req: &ScanRequest,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome> {
        let resolved = match self.resolve(req).await {
            Ok(resolved) => resolved,
            Err(e) => {
                if e.is_resolution() {
                    warn!("Scan rejected: {}", e);
                    self.events.emit_lossy(WitsEvent::ScanRejected {
                        tag_id: req.tag_id.clone(),
                        device_id: req.device_id.clone(),
                        reason: e.to_string(),
                        timestamp: now,
                    });
                }
                return Err(e);
            }
        };

        // Per-key critical section: duplicate-filter update and toggle
        // read-decide-write must be serialized for a key
        let _guard = self.locks.lock(&resolved.key).await;

        if !self.dedup.check_and_update(&resolved.key, now) {
            debug!(
                "Duplicate read suppressed for tag {} at {}",
                resolved.key.epc, resolved.key.location_code
            );
            let status = presence::get_by_key(&self.db, &resolved.key)
                .await?
                .map(|r| r.status);
            return Ok(ScanOutcome::DuplicateSuppressed { status });
        }

        let existing = presence::get_by_key(&self.db, &resolved.key).await?;
        match toggle::decide(existing.as_ref(), self.config.toggle_cooldown, now) {
            ToggleDecision::Create => {
                let record = PresenceRecord {
                    id: Uuid::new_v4(),
                    key: resolved.key,
                    lot_number: resolved.lot_number,
                    quantity: resolved.quantity,
                    status: PresenceStatus::In,
                    last_transition_at: now,
                    created_at: now,
                };
                presence::upsert(&self.db, &record).await?;
                self.apply_transition(&record, None, now);
                info!(
                    "Presence created for tag {} at {} (qty {})",
                    record.key.epc, record.key.location_code, record.quantity
                );
                Ok(ScanOutcome::Toggled {
                    record,
                    old_status: None,
                })
            }
            ToggleDecision::Ignore => {
                let record = existing.ok_or_else(|| {
                    Error::Internal("ignore decision without existing record".to_string())
                })?;
                let remaining = self.config.toggle_cooldown
                    - now.signed_duration_since(record.last_transition_at);
                debug!(
                    "Scan inside cooldown for tag {} at {} ({} ms remaining)",
                    record.key.epc,
                    record.key.location_code,
                    remaining.num_milliseconds()
                );
                Ok(ScanOutcome::IgnoredCooldown {
                    record,
                    remaining_ms: remaining.num_milliseconds().max(0),
                })
            }
            ToggleDecision::Flip { to } => {
                let prev = existing.ok_or_else(|| {
                    Error::Internal("flip decision without existing record".to_string())
                })?;
                // Quantity is fixed at the in transition: an out carries the
                // quantity recorded by the corresponding in, a re-entry may
                // refresh it from the new scan
                let quantity = match to {
                    PresenceStatus::In => resolved.quantity,
                    PresenceStatus::Out => prev.quantity,
                };
                let record = PresenceRecord {
                    id: prev.id,
                    key: prev.key.clone(),
                    lot_number: prev.lot_number.clone().or(resolved.lot_number),
                    quantity,
                    status: to,
                    last_transition_at: now,
                    created_at: prev.created_at,
                };
                presence::upsert(&self.db, &record).await?;
                self.apply_transition(&record, Some(prev.status), now);
                info!(
                    "Presence toggled {} -> {} for tag {} at {}",
                    prev.status, to, record.key.epc, record.key.location_code
                );
                Ok(ScanOutcome::Toggled {
                    record,
                    old_status: Some(prev.status),
                })
            }
        }
    }

    /// Process an ordered batch at the current server time
    pub async fn ingest_batch(&self, request: &BulkScanRequest) -> BulkScanResponse {
        self.ingest_batch_at(request, Utc::now()).await
    }

    /// Process an ordered batch at an explicit ingestion time
    ///
    /// Per-record failures do not abort the batch; a tag appearing twice in
    /// one batch is a duplicate against its first occurrence, evaluated in
    /// order.
    pub async fn ingest_batch_at(
        &self,
        request: &BulkScanRequest,
        now: DateTime<Utc>,
    ) -> BulkScanResponse {
        if let Some(session_id) = request.session_id {
            info!(
                "Bulk ingest session {}: {} scans",
                session_id,
                request.scans.len()
            );
        }

        let mut response = BulkScanResponse {
            created: 0,
            duplicates: 0,
            ignored: 0,
            errors: 0,
            duplicate_tags: Vec::new(),
            results: Vec::with_capacity(request.scans.len()),
        };

        for scan in &request.scans {
            match self.process_scan_at(scan, now).await {
                Ok(outcome) => {
                    match &outcome {
                        ScanOutcome::Toggled { .. } => response.created += 1,
                        ScanOutcome::IgnoredCooldown { .. } => response.ignored += 1,
                        ScanOutcome::DuplicateSuppressed { .. } => {
                            response.duplicates += 1;
                            response.duplicate_tags.push(scan.tag_id.clone());
                        }
                    }
                    response.results.push(outcome_to_response(&outcome));
                }
                Err(e) => {
                    response.errors += 1;
                    response.results.push(error_to_response(&e));
                }
            }
        }

        info!(
            "Bulk ingest complete: created={} duplicates={} ignored={} errors={}",
            response.created, response.duplicates, response.ignored, response.errors
        );
        response
    }

    /// Resolve a request to its presence key, lot and quantity
    async fn resolve(&self, req: &ScanRequest) -> Result<ResolvedScan> {
        let epc = req.tag_id.trim();
        if epc.is_empty() {
            return Err(Error::InvalidInput("tag_id must not be empty".to_string()));
        }

        if let (Some(location_code), Some(po_number), Some(item_number)) =
            (&req.location_code, &req.po_number, &req.item_number)
        {
            // Caller-resolved path: bypasses device resolution; the catalog
            // is consulted only to enrich lot and quantity
            let entry = self.catalog.resolve(epc).await?;
            let quantity = req
                .quantity
                .or_else(|| entry.as_ref().map(|e| e.ordered_quantity))
                .unwrap_or(1.0);
            return Ok(ResolvedScan {
                key: PresenceKey {
                    epc: epc.to_string(),
                    location_code: location_code.clone(),
                    po_number: po_number.clone(),
                    item_number: item_number.clone(),
                },
                lot_number: entry.and_then(|e| e.lot_number),
                quantity,
            });
        }

        let device_id = req.device_id.as_deref().ok_or_else(|| {
            Error::InvalidInput(
                "device_id is required unless location_code, po_number and item_number are supplied"
                    .to_string(),
            )
        })?;

        let location = self
            .locations
            .resolve(device_id)
            .await?
            .ok_or_else(|| Error::UnknownDevice {
                device_id: device_id.to_string(),
            })?;

        let entry = self
            .catalog
            .resolve(epc)
            .await?
            .ok_or_else(|| Error::UnknownTag {
                epc: epc.to_string(),
            })?;

        Ok(ResolvedScan {
            key: PresenceKey {
                epc: epc.to_string(),
                location_code: location.location_code,
                po_number: entry.po_number.clone(),
                item_number: entry.item_number.clone(),
            },
            quantity: req.quantity.unwrap_or(entry.ordered_quantity),
            lot_number: entry.lot_number,
        })
    }

    /// Update running totals and fan out events for an accepted transition
    ///
    /// Event delivery is best-effort: the persisted presence state is the
    /// source of truth and a missing subscriber never fails the decision.
    fn apply_transition(
        &self,
        record: &PresenceRecord,
        old_status: Option<PresenceStatus>,
        now: DateTime<Utc>,
    ) {
        let delta = match record.status {
            PresenceStatus::In => record.quantity,
            PresenceStatus::Out => -record.quantity,
        };
        let net = self
            .aggregator
            .apply(StockKey::for_record(record), delta, now);

        self.events.emit_lossy(WitsEvent::PresenceToggled {
            epc: record.key.epc.clone(),
            location_code: record.key.location_code.clone(),
            po_number: record.key.po_number.clone(),
            item_number: record.key.item_number.clone(),
            old_status,
            new_status: record.status,
            quantity: record.quantity,
            timestamp: now,
        });
        self.events.emit_lossy(WitsEvent::StockUpdated {
            item_number: record.key.item_number.clone(),
            lot_number: record.lot_number.clone(),
            po_number: record.key.po_number.clone(),
            net_quantity: net,
            timestamp: now,
        });
    }
}

/// Convert an outcome into the wire response
pub fn outcome_to_response(outcome: &ScanOutcome) -> ScanResponse {
    match outcome {
        ScanOutcome::Toggled { record, old_status } => ScanResponse {
            accepted: true,
            outcome: ScanOutcomeKind::Toggled,
            status: Some(record.status),
            message: match old_status {
                None => format!(
                    "first scan for tag {}: presence created at {}",
                    record.key.epc, record.key.location_code
                ),
                Some(old) => format!("presence toggled {} -> {}", old, record.status),
            },
            details: Some(json!({
                "location_code": record.key.location_code,
                "po_number": record.key.po_number,
                "item_number": record.key.item_number,
                "quantity": record.quantity,
            })),
        },
        ScanOutcome::IgnoredCooldown {
            record,
            remaining_ms,
        } => ScanResponse {
            accepted: false,
            outcome: ScanOutcomeKind::IgnoredCooldown,
            status: Some(record.status),
            message: "scan registered but state unchanged (toggle cooldown active)".to_string(),
            details: Some(json!({ "cooldown_remaining_ms": remaining_ms })),
        },
        ScanOutcome::DuplicateSuppressed { status } => ScanResponse {
            accepted: false,
            outcome: ScanOutcomeKind::DuplicateSuppressed,
            status: *status,
            message: "duplicate read suppressed within suppression window".to_string(),
            details: None,
        },
    }
}

/// Convert a processing error into the wire response
pub fn error_to_response(err: &Error) -> ScanResponse {
    let error_kind = match err {
        Error::UnknownDevice { .. } | Error::UnknownTag { .. } => "resolution",
        Error::InvalidInput(_) => "invalid_input",
        Error::Database(_) => "persistence",
        _ => "internal",
    };
    ScanResponse {
        accepted: false,
        outcome: ScanOutcomeKind::ResolutionError,
        status: None,
        message: err.to_string(),
        details: Some(json!({ "error_kind": error_kind })),
    }
}
