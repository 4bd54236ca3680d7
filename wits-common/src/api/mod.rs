//! Shared API types for WITS modules

pub mod types;
