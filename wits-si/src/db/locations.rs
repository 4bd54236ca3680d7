//! Location queries
//!
//! Maps a reader/device identifier to the warehouse location it guards.
//! At most one location per device (UNIQUE constraint on device_id).

use sqlx::{Row, SqlitePool};
use wits_common::Result;

/// One warehouse location guarded by a reader
#[derive(Debug, Clone, PartialEq)]
pub struct LocationEntry {
    /// Location code (unique key)
    pub location_code: String,
    /// Reader/device identifier (unique)
    pub device_id: String,
    /// Human-readable location name
    pub location_name: String,
}

/// Load the location configured for a device
pub async fn get_by_device(pool: &SqlitePool, device_id: &str) -> Result<Option<LocationEntry>> {
    let row = sqlx::query(
        r#"
        SELECT location_code, device_id, location_name
        FROM locations
        WHERE device_id = ?
        "#,
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| LocationEntry {
        location_code: row.get("location_code"),
        device_id: row.get("device_id"),
        location_name: row.get("location_name"),
    }))
}

/// Save a location (administrative seam; used by the external CRUD system
/// and test fixtures)
pub async fn save(pool: &SqlitePool, entry: &LocationEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO locations (location_code, device_id, location_name)
        VALUES (?, ?, ?)
        ON CONFLICT(location_code) DO UPDATE SET
            device_id = excluded.device_id,
            location_name = excluded.location_name
        "#,
    )
    .bind(&entry.location_code)
    .bind(&entry.device_id)
    .bind(&entry.location_name)
    .execute(pool)
    .await?;

    Ok(())
}
