//! # vaultgraph store
//!
//! SQLite-backed persistence for the knowledge graph engine. The
//! [`ContentStore`] exclusively owns persisted state: vaults, notes,
//! references, tags, per-note graph metrics and the scan audit trail.
//!
//! ## Tables
//!
//! | Table | Contents |
//! |---|---|
//! | `vaults` | one row per registered vault |
//! | `notes` | one row per `(vault_id, path)` |
//! | `note_references` | outgoing links, resolved in place |
//! | `tags` / `note_tags` | tag names and their note associations |
//! | `graph_metrics` | last computed metrics, one row per note |
//! | `scan_history` | append-only ingestion runs |
//!
//! ## Example
//!
//! ```
//! use std::path::Path;
//! use vaultgraph_store::ContentStore;
//!
//! let store = ContentStore::open_in_memory().unwrap();
//! let vault = store.upsert_vault(Path::new("/vaults/notes"), None).unwrap();
//! assert_eq!(vault.name, "notes");
//! assert!(store.get_notes_by_vault(&vault.id, None, None).unwrap().is_empty());
//! ```

pub mod error;
mod store;

pub use error::{Result, StoreError};
pub use store::{ContentStore, NoteWrite, VaultCounts};
