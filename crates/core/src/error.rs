//! Error types for pail-core
//!
//! Provides the unified error type shared by the facade and backend adapters.

use thiserror::Error;

/// Result type alias for pail operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pail operations
#[derive(Error, Debug)]
pub enum Error {
    /// Endpoint unreachable or client could not be constructed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Bucket existence check or creation failed
    #[error("Bucket error: {0}")]
    Bucket(String),

    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Object or bucket not found on the backend
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend call failed (upload, download, delete, list, presign)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Endpoint URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Whether this error indicates a missing object or bucket
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
