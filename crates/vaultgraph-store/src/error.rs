//! Error types for the store crate.

use thiserror::Error;

/// Errors that can occur in the content store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested row not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored data could not be decoded.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for vaultgraph_core::Error {
    fn from(err: StoreError) -> Self {
        vaultgraph_core::Error::store_error(err.to_string())
    }
}
