//! Presence record storage
//!
//! One record per `(epc, location_code, po_number, item_number)` key,
//! enforced by a unique index; the toggle engine upserts against it.
//! Records are never deleted by the engine.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use wits_common::{Error, PresenceStatus, Result};

/// Identity of a presence record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PresenceKey {
    /// Tag EPC / hex code
    pub epc: String,
    /// Warehouse location code
    pub location_code: String,
    /// Purchase order number
    pub po_number: String,
    /// Item number
    pub item_number: String,
}

/// Current presence state for one key
#[derive(Debug, Clone)]
pub struct PresenceRecord {
    pub id: Uuid,
    pub key: PresenceKey,
    pub lot_number: Option<String>,
    /// Quantity fixed at the `in` transition and carried to the matching `out`
    pub quantity: f64,
    pub status: PresenceStatus,
    pub last_transition_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("invalid {} timestamp '{}': {}", column, raw, e)))
}

fn record_from_row(row: &SqliteRow) -> Result<PresenceRecord> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("invalid presence record id '{}': {}", id_str, e)))?;

    let status_str: String = row.get("status");
    let status = PresenceStatus::parse(&status_str)
        .ok_or_else(|| Error::Internal(format!("invalid presence status '{}'", status_str)))?;

    let last_transition_raw: String = row.get("last_transition_at");
    let created_raw: String = row.get("created_at");

    Ok(PresenceRecord {
        id,
        key: PresenceKey {
            epc: row.get("epc"),
            location_code: row.get("location_code"),
            po_number: row.get("po_number"),
            item_number: row.get("item_number"),
        },
        lot_number: row.get("lot_number"),
        quantity: row.get("quantity"),
        status,
        last_transition_at: parse_timestamp(&last_transition_raw, "last_transition_at")?,
        created_at: parse_timestamp(&created_raw, "created_at")?,
    })
}

const RECORD_COLUMNS: &str =
    "id, epc, location_code, po_number, item_number, lot_number, quantity, status, last_transition_at, created_at";

/// Load the current record for a key
///
/// Lookups resolve to the most recent transition; with the unique key index
/// there is a single row, the ordering guards against legacy duplicates.
pub async fn get_by_key(pool: &SqlitePool, key: &PresenceKey) -> Result<Option<PresenceRecord>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {RECORD_COLUMNS}
        FROM presence_records
        WHERE epc = ? AND location_code = ? AND po_number = ? AND item_number = ?
        ORDER BY last_transition_at DESC
        LIMIT 1
        "#
    ))
    .bind(&key.epc)
    .bind(&key.location_code)
    .bind(&key.po_number)
    .bind(&key.item_number)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Create or update the record for its key
pub async fn upsert(pool: &SqlitePool, record: &PresenceRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO presence_records
            (id, epc, location_code, po_number, item_number, lot_number, quantity, status, last_transition_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(epc, location_code, po_number, item_number) DO UPDATE SET
            lot_number = excluded.lot_number,
            quantity = excluded.quantity,
            status = excluded.status,
            last_transition_at = excluded.last_transition_at
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.key.epc)
    .bind(&record.key.location_code)
    .bind(&record.key.po_number)
    .bind(&record.key.item_number)
    .bind(&record.lot_number)
    .bind(record.quantity)
    .bind(record.status.as_str())
    .bind(record.last_transition_at.to_rfc3339())
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every presence record (stock recomputation recovery path)
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<PresenceRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM presence_records ORDER BY epc, location_code"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Load the current records for a tag across all locations/POs
pub async fn list_by_epc(pool: &SqlitePool, epc: &str) -> Result<Vec<PresenceRecord>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {RECORD_COLUMNS}
        FROM presence_records
        WHERE epc = ?
        ORDER BY last_transition_at DESC
        "#
    ))
    .bind(epc)
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Count all presence records (diagnostics)
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM presence_records")
        .fetch_one(pool)
        .await?;
    Ok(total.0)
}
