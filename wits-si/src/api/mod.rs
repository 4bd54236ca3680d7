//! REST API implementation for the Scan Ingest service

pub mod handlers;
pub mod sse;

pub use handlers::{
    get_presence, get_stock, health, invalidate_cache, recompute_stock, submit_bulk, submit_scan,
};
pub use sse::event_stream;
