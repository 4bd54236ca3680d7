//! Common error types for WITS

use thiserror::Error;

/// Common result type for WITS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across WITS microservices
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reader device has no configured location (misconfigured reader)
    #[error("No location configured for device {device_id}")]
    UnknownDevice { device_id: String },

    /// Tag has no catalog entry and one is required
    #[error("No catalog entry for tag {epc}")]
    UnknownTag { epc: String },

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is a resolution failure (unknown device or tag).
    ///
    /// Resolution errors indicate a configuration problem, not a transient
    /// condition, and are reported to the caller with a 4xx status.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Error::UnknownDevice { .. } | Error::UnknownTag { .. }
        )
    }
}
