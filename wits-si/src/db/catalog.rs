//! Tag catalog queries
//!
//! The catalog maps a hex/EPC code to its purchase-order line. Entries are
//! created by the external receiving workflow; the engine only reads them.

use sqlx::{Row, SqlitePool};
use wits_common::Result;

/// One catalog entry: a tag correlated to a purchase-order line item
#[derive(Debug, Clone, PartialEq)]
pub struct TagCatalogEntry {
    /// Hex/EPC code (unique key)
    pub epc: String,
    /// Purchase order number
    pub po_number: String,
    /// Item number on the PO line
    pub item_number: String,
    /// Lot number, when the line carries one
    pub lot_number: Option<String>,
    /// Quantity ordered on the line
    pub ordered_quantity: f64,
    /// Unit of measure (EA, CS, ...)
    pub unit_of_measure: Option<String>,
}

/// Load a catalog entry by EPC (case-sensitive exact match)
pub async fn get_by_epc(pool: &SqlitePool, epc: &str) -> Result<Option<TagCatalogEntry>> {
    let row = sqlx::query(
        r#"
        SELECT epc, po_number, item_number, lot_number, ordered_quantity, unit_of_measure
        FROM tag_catalog
        WHERE epc = ?
        "#,
    )
    .bind(epc)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| TagCatalogEntry {
        epc: row.get("epc"),
        po_number: row.get("po_number"),
        item_number: row.get("item_number"),
        lot_number: row.get("lot_number"),
        ordered_quantity: row.get("ordered_quantity"),
        unit_of_measure: row.get("unit_of_measure"),
    }))
}

/// Save a catalog entry (administrative seam; used by the external CRUD
/// system and test fixtures)
pub async fn save(pool: &SqlitePool, entry: &TagCatalogEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tag_catalog (epc, po_number, item_number, lot_number, ordered_quantity, unit_of_measure)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(epc) DO UPDATE SET
            po_number = excluded.po_number,
            item_number = excluded.item_number,
            lot_number = excluded.lot_number,
            ordered_quantity = excluded.ordered_quantity,
            unit_of_measure = excluded.unit_of_measure
        "#,
    )
    .bind(&entry.epc)
    .bind(&entry.po_number)
    .bind(&entry.item_number)
    .bind(&entry.lot_number)
    .bind(entry.ordered_quantity)
    .bind(&entry.unit_of_measure)
    .execute(pool)
    .await?;

    Ok(())
}
