//! Stock aggregator
//!
//! Maintains running signed-quantity totals per (item, lot, PO) bucket:
//! quantity is added when a key transitions to `in` and subtracted when it
//! transitions to `out`. The totals are a derived view: `recompute`
//! rebuilds them from the full presence ledger as the recovery path, and
//! must agree with the incrementally maintained values for any interleaving
//! of accepted transitions.

use crate::db::presence::{self, PresenceRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::RwLock;
use wits_common::{PresenceStatus, Result};

/// Aggregation bucket identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StockKey {
    pub item_number: String,
    pub lot_number: Option<String>,
    pub po_number: String,
}

impl StockKey {
    /// Bucket for a presence record
    pub fn for_record(record: &PresenceRecord) -> Self {
        Self {
            item_number: record.key.item_number.clone(),
            lot_number: record.lot_number.clone(),
            po_number: record.key.po_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    net: f64,
    last_updated: DateTime<Utc>,
}

/// One row of the stock summary view
#[derive(Debug, Clone, Serialize)]
pub struct StockSummaryEntry {
    pub item_number: String,
    pub lot_number: Option<String>,
    pub po_number: String,
    pub net_quantity: f64,
    pub last_updated: DateTime<Utc>,
}

/// Global stock figures
#[derive(Debug, Clone, Serialize)]
pub struct StockStats {
    /// Distinct item numbers with tracked buckets
    pub distinct_items: usize,
    /// Distinct purchase orders with tracked buckets
    pub distinct_pos: usize,
    /// Total on-hand quantity across all buckets
    pub total_on_hand: f64,
}

/// Point-in-time stock view consumed by dashboard/reporting collaborators
#[derive(Debug, Clone, Serialize)]
pub struct StockSnapshot {
    pub stats: StockStats,
    pub summary: Vec<StockSummaryEntry>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Running stock totals, safe to query concurrently with updates
pub struct StockAggregator {
    totals: RwLock<HashMap<StockKey, Bucket>>,
}

impl StockAggregator {
    pub fn new() -> Self {
        Self {
            totals: RwLock::new(HashMap::new()),
        }
    }

    /// Apply an accepted transition delta and return the bucket's new net
    pub fn apply(&self, key: StockKey, delta: f64, at: DateTime<Utc>) -> f64 {
        let mut totals = self
            .totals
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let bucket = totals.entry(key).or_insert(Bucket {
            net: 0.0,
            last_updated: at,
        });
        bucket.net += delta;
        bucket.last_updated = at;
        bucket.net
    }

    /// Consistent point-in-time snapshot of all buckets
    pub fn snapshot(&self) -> StockSnapshot {
        let totals = self
            .totals
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut summary: Vec<StockSummaryEntry> = totals
            .iter()
            .map(|(key, bucket)| StockSummaryEntry {
                item_number: key.item_number.clone(),
                lot_number: key.lot_number.clone(),
                po_number: key.po_number.clone(),
                net_quantity: bucket.net,
                last_updated: bucket.last_updated,
            })
            .collect();
        summary.sort_by(|a, b| {
            (&a.item_number, &a.lot_number, &a.po_number)
                .cmp(&(&b.item_number, &b.lot_number, &b.po_number))
        });

        let mut items: Vec<&str> = summary.iter().map(|e| e.item_number.as_str()).collect();
        items.sort_unstable();
        items.dedup();

        let mut pos: Vec<&str> = summary.iter().map(|e| e.po_number.as_str()).collect();
        pos.sort_unstable();
        pos.dedup();

        StockSnapshot {
            stats: StockStats {
                distinct_items: items.len(),
                distinct_pos: pos.len(),
                total_on_hand: summary.iter().map(|e| e.net_quantity).sum(),
            },
            last_updated: summary.iter().map(|e| e.last_updated).max(),
            summary,
        }
    }

    /// Rebuild the totals from the full presence ledger (recovery path)
    ///
    /// A record currently `in` contributes its quantity; a record currently
    /// `out` contributes zero, since its earlier `in` and the matching `out`
    /// cancel under the carried-quantity policy. The bucket itself is kept
    /// so the rebuilt view matches the incrementally maintained one exactly.
    pub async fn recompute(&self, pool: &SqlitePool) -> Result<StockSnapshot> {
        let records = presence::list_all(pool).await?;

        let mut rebuilt: HashMap<StockKey, Bucket> = HashMap::new();
        for record in &records {
            let contribution = match record.status {
                PresenceStatus::In => record.quantity,
                PresenceStatus::Out => 0.0,
            };
            let bucket = rebuilt
                .entry(StockKey::for_record(record))
                .or_insert(Bucket {
                    net: 0.0,
                    last_updated: record.last_transition_at,
                });
            bucket.net += contribution;
            if record.last_transition_at > bucket.last_updated {
                bucket.last_updated = record.last_transition_at;
            }
        }

        {
            let mut totals = self
                .totals
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *totals = rebuilt;
        }

        Ok(self.snapshot())
    }
}

impl Default for StockAggregator {
    fn default() -> Self {
        Self::new()
    }
}
