//! Database initialization
//!
//! Creates the WITS schema on first run. All statements are idempotent
//! (`CREATE TABLE IF NOT EXISTS`), so initialization is safe to repeat.
//!
//! The `tag_catalog` and `locations` tables are owned by the external CRUD
//! system; the scan engine only reads them. `presence_records` is the
//! engine's own ledger and is mutated exclusively by the toggle engine.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows concurrent readers with one writer; scan submissions from
    // many devices read and write the same file
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_settings_table(&pool).await?;
    create_tag_catalog_table(&pool).await?;
    create_locations_table(&pool).await?;
    create_presence_records_table(&pool).await?;

    init_default_settings(&pool).await?;

    Ok(pool)
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_tag_catalog_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tag_catalog (
            epc TEXT PRIMARY KEY,
            po_number TEXT NOT NULL,
            item_number TEXT NOT NULL,
            lot_number TEXT,
            ordered_quantity REAL NOT NULL DEFAULT 1.0,
            unit_of_measure TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_locations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS locations (
            location_code TEXT PRIMARY KEY,
            device_id TEXT NOT NULL UNIQUE,
            location_name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_presence_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS presence_records (
            id TEXT PRIMARY KEY,
            epc TEXT NOT NULL,
            location_code TEXT NOT NULL,
            po_number TEXT NOT NULL,
            item_number TEXT NOT NULL,
            lot_number TEXT,
            quantity REAL NOT NULL DEFAULT 1.0,
            status TEXT NOT NULL CHECK (status IN ('in', 'out')),
            last_transition_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One record per (epc, location, po, item) key; the toggle engine
    // upserts against this index
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_presence_key
        ON presence_records (epc, location_code, po_number, item_number)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_presence_epc
        ON presence_records (epc)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Write default values for settings that do not exist yet
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for (key, value) in [
        (crate::db::settings::TOGGLE_COOLDOWN_MS, "30000"),
        (crate::db::settings::SUPPRESSION_WINDOW_MS, "500"),
    ] {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO NOTHING",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    }
    Ok(())
}
