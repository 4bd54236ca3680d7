//! Database access layer for wits-si
//!
//! The `tag_catalog` and `locations` tables are read-only from this module's
//! perspective (seeded by the external CRUD system); `presence_records` is
//! the engine-owned ledger.

pub mod catalog;
pub mod locations;
pub mod presence;

pub use catalog::TagCatalogEntry;
pub use locations::LocationEntry;
pub use presence::{PresenceKey, PresenceRecord};
