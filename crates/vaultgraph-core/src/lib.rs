//! # vaultgraph core
//!
//! Core data models, error types and configuration for the vault knowledge
//! graph engine. This crate defines the canonical types that all other crates
//! depend on.
//!
//! ## Core Modules
//!
//! - [`models`] - Vault, note, reference and metrics records
//! - [`error`] - Error taxonomy and the `Result` alias
//! - [`config`] - Engine configuration with YAML persistence
//! - [`profiles`] - Configuration presets
//! - [`utils`] - Stable hashing and path helpers
//!
//! ## Usage
//!
//! ```
//! use vaultgraph_core::prelude::*;
//! use std::path::Path;
//!
//! let vault = VaultId::for_path(Path::new("/home/me/notes"));
//! let note = NoteId::for_path(&vault, "ideas/Graph.md");
//! assert_eq!(note, NoteId::for_path(&vault, "ideas/Graph.md"));
//!
//! let config = ConfigProfile::Testing.create_config();
//! assert!(config.is_in_memory());
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod profiles;
pub mod utils;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{Error, Result};
pub use models::*;
pub use profiles::ConfigProfile;
pub use utils::{content_hash, stable_id};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        BrokenReference, GraphMetrics, Metadata, MetricsSummary, Note, NoteDegree, NoteId,
        ParsedNote, RawReference, Reference, ReferenceTarget, ResolutionStats, ScanProgress,
        ScanRecord, ScanStats, ScanStatus, TagCount, UpsertOutcome, Vault, VaultId,
    };
    pub use crate::profiles::ConfigProfile;
}
