//! Settings database access
//!
//! Read/write settings from the settings table (key-value store).
//! All settings are global/system-wide.

use crate::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// Minimum elapsed time before a repeat scan of a key may flip presence state
pub const TOGGLE_COOLDOWN_MS: &str = "toggle_cooldown_ms";

/// Minimum elapsed time before a repeat scan of a key is even considered
pub const SUPPRESSION_WINDOW_MS: &str = "suppression_window_ms";

/// Get a typed setting value, `None` if the key is absent
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row {
        Some((raw,)) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("setting {} has invalid value: {}", key, raw))),
        None => Ok(None),
    }
}

/// Set a setting value, creating or replacing the key
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;
    Ok(())
}

/// Get the toggle cooldown in milliseconds, writing the default on first read
pub async fn get_toggle_cooldown_ms(db: &Pool<Sqlite>) -> Result<i64> {
    match get_setting::<i64>(db, TOGGLE_COOLDOWN_MS).await? {
        Some(ms) => Ok(ms),
        None => {
            set_setting(db, TOGGLE_COOLDOWN_MS, 30000i64).await?;
            Ok(30000)
        }
    }
}

/// Get the duplicate suppression window in milliseconds, writing the default
/// on first read
pub async fn get_suppression_window_ms(db: &Pool<Sqlite>) -> Result<i64> {
    match get_setting::<i64>(db, SUPPRESSION_WINDOW_MS).await? {
        Some(ms) => Ok(ms),
        None => {
            set_setting(db, SUPPRESSION_WINDOW_MS, 500i64).await?;
            Ok(500)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;

    async fn setup_db() -> (tempfile::TempDir, Pool<Sqlite>) {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let pool = init_database(&dir.path().join("wits.db"))
            .await
            .expect("Should initialize database");
        (dir, pool)
    }

    #[tokio::test]
    async fn test_defaults_written_on_init() {
        let (_dir, pool) = setup_db().await;

        assert_eq!(get_toggle_cooldown_ms(&pool).await.unwrap(), 30000);
        assert_eq!(get_suppression_window_ms(&pool).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_set_and_get_roundtrip() {
        let (_dir, pool) = setup_db().await;

        set_setting(&pool, TOGGLE_COOLDOWN_MS, 45000i64).await.unwrap();
        assert_eq!(get_toggle_cooldown_ms(&pool).await.unwrap(), 45000);
    }

    #[tokio::test]
    async fn test_missing_setting_returns_none() {
        let (_dir, pool) = setup_db().await;

        let value: Option<i64> = get_setting(&pool, "no_such_key").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_invalid_value_is_config_error() {
        let (_dir, pool) = setup_db().await;

        set_setting(&pool, TOGGLE_COOLDOWN_MS, "not-a-number").await.unwrap();
        let result: Result<Option<i64>> = get_setting(&pool, TOGGLE_COOLDOWN_MS).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
