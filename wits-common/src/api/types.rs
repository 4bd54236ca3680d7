//! Shared API request/response types
//!
//! Types used by the scan submission surface and its clients (fixed reader
//! bridges, handheld batch uploads, dashboard pollers).

use crate::events::PresenceStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ========================================
// Scan Submission Types
// ========================================

/// A single raw scan submission
///
/// `tag_id` is always required. Either `device_id` is present (the normal
/// reader path, resolved to a location server-side), or the caller supplies
/// an already-resolved `location_code` + `po_number` + `item_number`
/// combination, which bypasses device resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Tag EPC or generated hex code
    pub tag_id: String,

    /// Reader/device identifier (resolved to a location server-side)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Caller-resolved location code (alternate path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_code: Option<String>,

    /// Caller-resolved purchase order number (alternate path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,

    /// Caller-resolved item number (alternate path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_number: Option<String>,

    /// Received signal strength as reported by the reader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<String>,

    /// Quantity associated with the read (defaults to the catalog ordered
    /// quantity, then 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,

    /// Number of raw reads collapsed into this submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_count: Option<u32>,

    /// Device timestamp (Unix epoch milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ScanRequest {
    /// Minimal reader-path request
    pub fn new(tag_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            tag_id: tag_id.into(),
            device_id: Some(device_id.into()),
            location_code: None,
            po_number: None,
            item_number: None,
            rssi: None,
            quantity: None,
            read_count: None,
            timestamp: None,
        }
    }

    /// Whether the caller supplied the fully-resolved key fields
    pub fn has_resolved_key(&self) -> bool {
        self.location_code.is_some() && self.po_number.is_some() && self.item_number.is_some()
    }
}

/// Outcome classification for a processed scan
///
/// Cooldown-ignored and duplicate-suppressed are normal, expected outcomes
/// communicated on the success path; only resolution failures use the error
/// channel and a 4xx status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcomeKind {
    /// Presence state was created or flipped
    Toggled,
    /// Scan acknowledged but inside the toggle cooldown; state unchanged
    IgnoredCooldown,
    /// Scan suppressed by the short-horizon duplicate filter
    DuplicateSuppressed,
    /// Device or tag could not be resolved
    ResolutionError,
}

/// Response for a single scan submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    /// Whether the scan produced a state transition
    pub accepted: bool,
    /// Outcome classification
    pub outcome: ScanOutcomeKind,
    /// Current presence status for the key, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PresenceStatus>,
    /// Human-readable explanation for UI display
    pub message: String,
    /// Additional outcome details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

// ========================================
// Bulk Submission Types
// ========================================

/// An ordered batch of scan submissions (e.g. a handheld upload)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkScanRequest {
    /// Scans, processed in order
    pub scans: Vec<ScanRequest>,
    /// Optional upload session identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

/// Summary response for a bulk submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkScanResponse {
    /// Accepted transitions (created or flipped)
    pub created: usize,
    /// Duplicate-suppressed scans
    pub duplicates: usize,
    /// Cooldown-ignored scans (acknowledged no-ops)
    pub ignored: usize,
    /// Resolution or persistence failures
    pub errors: usize,
    /// Tag identifiers suppressed as duplicates, in batch order
    pub duplicate_tags: Vec<String>,
    /// Per-record outcomes, in batch order
    pub results: Vec<ScanResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_request_minimal_deserialization() {
        let json = r#"{"tag_id": "QUICK123", "device_id": "DEVICE002"}"#;
        let request: ScanRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.tag_id, "QUICK123");
        assert_eq!(request.device_id.as_deref(), Some("DEVICE002"));
        assert!(request.quantity.is_none());
        assert!(!request.has_resolved_key());
    }

    #[test]
    fn test_scan_request_resolved_key_path() {
        let json = r#"{
            "tag_id": "QUICK123",
            "location_code": "DOCK-01",
            "po_number": "PO-4711",
            "item_number": "ITEM-100"
        }"#;
        let request: ScanRequest = serde_json::from_str(json).unwrap();
        assert!(request.has_resolved_key());
        assert!(request.device_id.is_none());
    }

    #[test]
    fn test_outcome_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&ScanOutcomeKind::Toggled).unwrap(),
            "\"toggled\""
        );
        assert_eq!(
            serde_json::to_string(&ScanOutcomeKind::IgnoredCooldown).unwrap(),
            "\"ignored_cooldown\""
        );
        assert_eq!(
            serde_json::to_string(&ScanOutcomeKind::DuplicateSuppressed).unwrap(),
            "\"duplicate_suppressed\""
        );
        assert_eq!(
            serde_json::to_string(&ScanOutcomeKind::ResolutionError).unwrap(),
            "\"resolution_error\""
        );
    }

    #[test]
    fn test_scan_response_omits_empty_fields() {
        let response = ScanResponse {
            accepted: true,
            outcome: ScanOutcomeKind::Toggled,
            status: Some(PresenceStatus::In),
            message: "presence created".to_string(),
            details: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"in\""));
        assert!(!json.contains("details"));
    }
}
