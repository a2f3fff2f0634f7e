//! Error types for the vaultgraph system.
//!
//! All errors crossing a crate boundary are represented by the [`Error`] enum.
//! Per-file ingestion failures are *not* errors at this level: the ingestor
//! records them in `ScanStats::errors` and keeps going.

use std::io;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// The core error type for all vaultgraph operations.
#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid or unregistered vault path / id
    #[error("Vault not found: {key}")]
    VaultNotFound { key: String },

    /// Directory exists but carries no vault marker
    #[error("Not a vault (missing {marker} directory): {path}")]
    NotAVault { path: PathBuf, marker: String },

    /// Note id unknown to the store
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// Vault-level ingestion abort
    #[error("Scan failed for vault {vault}: {reason}")]
    ScanFailure { vault: String, reason: String },

    /// Unexpected failure during resolution or metrics computation
    #[error("Analysis failed: {reason}")]
    AnalysisFailure { reason: String },

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Document could not be parsed
    #[error("Parse error in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Persistent store failure
    #[error("Store error: {reason}")]
    Store { reason: String },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a vault not found error
    pub fn vault_not_found(key: impl Into<String>) -> Self {
        Error::VaultNotFound { key: key.into() }
    }

    /// Create a not-a-vault error
    pub fn not_a_vault(path: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        Error::NotAVault {
            path: path.into(),
            marker: marker.into(),
        }
    }

    /// Create a note not found error
    pub fn note_not_found(id: impl Into<String>) -> Self {
        Error::NoteNotFound { id: id.into() }
    }

    /// Create a scan failure
    pub fn scan_failure(vault: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ScanFailure {
            vault: vault.into(),
            reason: reason.into(),
        }
    }

    /// Create an analysis failure
    pub fn analysis_failure(reason: impl Into<String>) -> Self {
        Error::AnalysisFailure {
            reason: reason.into(),
        }
    }

    /// Create a parse error
    pub fn parse_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a store error
    pub fn store_error(reason: impl Into<String>) -> Self {
        Error::Store {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// True for precondition failures the caller can fix by pointing at a
    /// different vault or note.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::VaultNotFound { .. } | Error::NotAVault { .. } | Error::NoteNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::vault_not_found("/path/to/vault");
        assert!(err.to_string().contains("Vault not found"));
        assert!(err.is_not_found());

        let err = Error::not_a_vault("/tmp/x", ".obsidian");
        assert!(err.to_string().contains(".obsidian"));

        let err = Error::analysis_failure("store closed");
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Analysis failed: store closed");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
