//! Device-to-location resolver
//!
//! Maps a reader/device identifier to the warehouse location it guards,
//! through a read-through cache over the `locations` table. A miss here
//! means a misconfigured reader, not a transient condition, so the pipeline
//! surfaces it with a specific diagnostic rather than dropping the scan.

use crate::db::locations::{self, LocationEntry};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use wits_common::{Error, Result};

/// Read-through cache over the locations table, keyed by device id
pub struct LocationResolver {
    pool: SqlitePool,
    cache: RwLock<HashMap<String, LocationEntry>>,
}

impl LocationResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a device identifier to its configured location
    pub async fn resolve(&self, device_id: &str) -> Result<Option<LocationEntry>> {
        if device_id.is_empty() {
            return Err(Error::InvalidInput(
                "device identifier must not be empty".to_string(),
            ));
        }

        if let Some(entry) = self.cache.read().await.get(device_id) {
            return Ok(Some(entry.clone()));
        }

        let entry = locations::get_by_device(&self.pool, device_id).await?;
        if let Some(ref found) = entry {
            self.cache
                .write()
                .await
                .insert(device_id.to_string(), found.clone());
        }
        Ok(entry)
    }

    /// Invalidate one cached device mapping
    pub async fn invalidate_device(&self, device_id: &str) {
        self.cache.write().await.remove(device_id);
    }

    /// Invalidate the whole cache
    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }
}
