//! # vaultgraph graph
//!
//! Reference resolution and graph analytics on top of the content store.
//!
//! - [`ReferenceResolver`] maps raw `[[link]]` text to note ids, vault-wide
//! - [`GraphEngine`] builds a [`KnowledgeGraph`] from resolved references and
//!   computes per-note metrics
//! - [`GraphAlgorithms`] is the pluggable metric backend;
//!   [`StandardAlgorithms`] is the default
//!
//! ```
//! use std::path::Path;
//! use std::sync::Arc;
//! use vaultgraph_graph::{GraphEngine, ReferenceResolver};
//! use vaultgraph_store::ContentStore;
//!
//! let store = Arc::new(ContentStore::open_in_memory().unwrap());
//! let vault = store.upsert_vault(Path::new("/vaults/empty"), None).unwrap();
//!
//! let stats = ReferenceResolver::new(store.clone(), "md").resolve_all(&vault.id).unwrap();
//! assert_eq!(stats.total_references, 0);
//!
//! let graph = GraphEngine::new(store).build_graph(&vault.id).unwrap();
//! assert!(graph.is_empty());
//! ```

pub mod algorithms;
pub mod engine;
pub mod graph;
pub mod resolver;

pub use algorithms::{AlgorithmError, GraphAlgorithms, Scores, StandardAlgorithms};
pub use engine::GraphEngine;
pub use graph::{GraphNode, KnowledgeGraph};
pub use resolver::{LinkIndex, ReferenceResolver};
