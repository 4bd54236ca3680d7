//! Hex/EPC resolver
//!
//! Maps a tag identifier to its purchase-order line via a read-through
//! cache over the `tag_catalog` table. The cache is owned by the pipeline
//! (dependency-injected, not ambient global state) and invalidated through
//! the administrative hook when catalog entries change.
//!
//! "Not found" is a normal, expected outcome here: unregistered or test
//! tags produce `Ok(None)`, and the caller decides whether that is fatal.

use crate::db::catalog::{self, TagCatalogEntry};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use wits_common::{Error, Result};

/// Read-through cache over the tag catalog
pub struct CatalogResolver {
    pool: SqlitePool,
    cache: RwLock<HashMap<String, TagCatalogEntry>>,
}

impl CatalogResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a tag identifier to its catalog entry
    ///
    /// Case-sensitive exact match. An empty identifier is an input error;
    /// an unknown identifier is a normal negative result. Only hits are
    /// cached, so a tag registered after a miss is picked up on the next
    /// scan without an invalidation round-trip.
    pub async fn resolve(&self, epc: &str) -> Result<Option<TagCatalogEntry>> {
        if epc.is_empty() {
            return Err(Error::InvalidInput(
                "tag identifier must not be empty".to_string(),
            ));
        }

        if let Some(entry) = self.cache.read().await.get(epc) {
            return Ok(Some(entry.clone()));
        }

        let entry = catalog::get_by_epc(&self.pool, epc).await?;
        if let Some(ref found) = entry {
            self.cache
                .write()
                .await
                .insert(epc.to_string(), found.clone());
        }
        Ok(entry)
    }

    /// Invalidate one cached entry (administrative correction hook)
    pub async fn invalidate(&self, epc: &str) {
        self.cache.write().await.remove(epc);
    }

    /// Invalidate the whole cache
    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }

    /// Number of cached entries
    pub async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }
}
