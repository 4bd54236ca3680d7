//! Event types for the WITS event system
//!
//! Provides shared event definitions and EventBus for all WITS modules.
//! Events are broadcast via EventBus and can be serialized for SSE transmission.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Presence state of a tag at a location
///
/// A tag is assumed to be entering when first observed, so the initial
/// state for a new presence key is always `In`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Tag is present at the location
    In,
    /// Tag has left the location
    Out,
}

impl PresenceStatus {
    /// The opposite state (`in` ↔ `out`)
    pub fn toggled(self) -> Self {
        match self {
            PresenceStatus::In => PresenceStatus::Out,
            PresenceStatus::Out => PresenceStatus::In,
        }
    }

    /// Lowercase wire representation, matching the stored column value
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::In => "in",
            PresenceStatus::Out => "out",
        }
    }

    /// Parse the stored column value back into a status
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(PresenceStatus::In),
            "out" => Some(PresenceStatus::Out),
            _ => None,
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WITS event types
///
/// Shared across WITS modules; broadcast via EventBus and serialized
/// for SSE transmission to dashboard clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WitsEvent {
    /// A presence record was created or flipped by an accepted scan
    ///
    /// Triggers:
    /// - SSE: Update live presence display
    /// - Persistence consumers: Record the transition
    PresenceToggled {
        /// Tag EPC / hex code
        epc: String,
        /// Warehouse location the reader guards
        location_code: String,
        /// Purchase order number
        po_number: String,
        /// Item number on the PO line
        item_number: String,
        /// Status before the transition (None on first observation)
        old_status: Option<PresenceStatus>,
        /// Status after the transition
        new_status: PresenceStatus,
        /// Quantity carried by the record
        quantity: f64,
        /// When the transition occurred
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A scan could not be resolved to a location or catalog entry
    ///
    /// Triggers:
    /// - SSE: Surface misconfigured readers / unregistered tags
    ScanRejected {
        /// Tag identifier as submitted
        tag_id: String,
        /// Device identifier as submitted (if any)
        device_id: Option<String>,
        /// Human-readable rejection reason
        reason: String,
        /// When the scan was rejected
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Running stock total changed for an (item, lot, PO) bucket
    ///
    /// Triggers:
    /// - SSE: Refresh dashboard stock figures
    StockUpdated {
        /// Item number
        item_number: String,
        /// Lot number (if the catalog entry carries one)
        lot_number: Option<String>,
        /// Purchase order number
        po_number: String,
        /// Net on-hand quantity for the bucket after the update
        net_quantity: f64,
        /// When the total changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl WitsEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            WitsEvent::PresenceToggled { .. } => "PresenceToggled",
            WitsEvent::ScanRejected { .. } => "ScanRejected",
            WitsEvent::StockUpdated { .. } => "StockUpdated",
        }
    }
}

/// Broadcast bus for WITS events
///
/// Wraps a tokio broadcast channel. Subscribers receive all events emitted
/// after subscription; slow subscribers may lag and drop old events.
pub struct EventBus {
    tx: broadcast::Sender<WitsEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<WitsEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WitsEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<WitsEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring delivery failures
    ///
    /// Downstream notification is best-effort: the presence state is the
    /// source of truth, and a missing subscriber must never fail the
    /// toggle decision that produced the event.
    pub fn emit_lossy(&self, event: WitsEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("No subscribers for event: {}", e.0.event_type());
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
