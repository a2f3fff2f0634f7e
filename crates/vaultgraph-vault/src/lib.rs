//! # vaultgraph vault
//!
//! Vault discovery and ingestion. A vault is a directory carrying a marker
//! subdirectory (`.obsidian` by default); its notes are the files with the
//! configured extension, minus anything under a hidden path component.
//!
//! [`VaultIngestor`] parses notes in fixed-size batches, writes them through
//! the content store and yields to the runtime between batches. It leaves
//! references unresolved.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use vaultgraph_core::EngineConfig;
//! use vaultgraph_store::ContentStore;
//! use vaultgraph_vault::VaultIngestor;
//!
//! #[tokio::main]
//! async fn main() -> vaultgraph_core::Result<()> {
//!     let store = Arc::new(ContentStore::open_in_memory()?);
//!     let ingestor = VaultIngestor::new(store, &EngineConfig::default());
//!     let stats = ingestor.ingest(Path::new("/path/to/vault"), None, None).await?;
//!     println!("{} notes, {} errors", stats.notes_scanned, stats.errors.len());
//!     Ok(())
//! }
//! ```

pub mod discovery;
pub mod ingest;

pub use discovery::{discover_vaults, is_vault, note_files};
pub use ingest::{ProgressFn, VaultIngestor};
pub use tokio_util::sync::CancellationToken;
