//! # vaultgraph
//!
//! Knowledge graph engine for Obsidian-style markdown vaults.
//!
//! [`KnowledgeBase`] wires the pipeline together and is the API that
//! presentation layers talk to:
//!
//! 1. **ingest** walks a vault and stores notes with unresolved references
//! 2. **resolve** maps every reference to a note or marks it broken
//! 3. **compute metrics** builds the graph and persists per-note centrality
//! 4. read queries and [`DerivedViews`] answer structural questions
//!
//! ```no_run
//! use std::path::Path;
//! use vaultgraph::KnowledgeBase;
//! use vaultgraph_core::ConfigProfile;
//!
//! #[tokio::main]
//! async fn main() -> vaultgraph_core::Result<()> {
//!     let kb = KnowledgeBase::open(ConfigProfile::Production.create_config())?;
//!     let stats = kb.ingest(Path::new("/path/to/vault"), None, None).await?;
//!     if let Some(vault_id) = stats.vault_id {
//!         let report = kb.analyze_vault(&vault_id)?;
//!         println!("{} notes, {} broken links", report.total_notes, report.links_broken);
//!     }
//!     Ok(())
//! }
//! ```

pub mod reports;
pub mod views;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::instrument;
use vaultgraph_core::{
    BrokenReference, EngineConfig, Error, GraphMetrics, MetricsSummary, Note, NoteDegree, NoteId,
    Reference, ResolutionStats, Result, ScanRecord, ScanStats, TagCount, Vault, VaultId,
};
use vaultgraph_graph::{GraphEngine, KnowledgeGraph, ReferenceResolver};
use vaultgraph_store::ContentStore;
use vaultgraph_vault::{CancellationToken, ProgressFn, VaultIngestor};

pub use reports::{AnalysisReport, LinkDistribution, VaultStats};
pub use views::DerivedViews;

/// Facade over store, ingestor, resolver and graph engine
pub struct KnowledgeBase {
    config: EngineConfig,
    store: Arc<ContentStore>,
    ingestor: VaultIngestor,
    resolver: ReferenceResolver,
    engine: GraphEngine,
}

impl KnowledgeBase {
    /// Open the store named by `config` (in memory when it names none)
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = match config.resolved_database_path() {
            Some(path) => ContentStore::open(&path)?,
            None => ContentStore::open_in_memory()?,
        };
        Self::with_store(config, Arc::new(store))
    }

    pub fn with_store(config: EngineConfig, store: Arc<ContentStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ingestor: VaultIngestor::new(store.clone(), &config),
            resolver: ReferenceResolver::new(store.clone(), config.extension()),
            engine: GraphEngine::from_config(store.clone(), &config),
            config,
            store,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    pub fn views(&self) -> DerivedViews<'_> {
        DerivedViews::new(&self.store, &self.engine)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read API
    // ─────────────────────────────────────────────────────────────────────

    pub fn list_vaults(&self) -> Result<Vec<Vault>> {
        Ok(self.store.list_vaults()?)
    }

    pub fn get_vault(&self, vault_id: &VaultId) -> Result<Vault> {
        self.store
            .get_vault(vault_id)?
            .ok_or_else(|| Error::vault_not_found(vault_id.as_str()))
    }

    pub fn list_notes(
        &self,
        vault_id: &VaultId,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Note>> {
        self.get_vault(vault_id)?;
        Ok(self.store.get_notes_by_vault(vault_id, limit, offset)?)
    }

    pub fn get_note(&self, note_id: &NoteId) -> Result<Note> {
        self.store
            .get_note(note_id)?
            .ok_or_else(|| Error::note_not_found(note_id.as_str()))
    }

    pub fn get_outgoing_references(&self, note_id: &NoteId) -> Result<Vec<Reference>> {
        Ok(self.store.get_references_from(note_id)?)
    }

    pub fn get_incoming_references(&self, note_id: &NoteId) -> Result<Vec<Reference>> {
        Ok(self.store.get_references_to(note_id)?)
    }

    pub fn get_tags(&self, note_id: &NoteId) -> Result<Vec<String>> {
        Ok(self.store.get_note_tags(note_id)?)
    }

    pub fn get_graph_metrics(&self, note_id: &NoteId) -> Result<Option<GraphMetrics>> {
        Ok(self.store.get_metrics(note_id)?)
    }

    /// Hubs at the configured threshold
    pub fn get_hub_notes(&self, vault_id: &VaultId, limit: usize) -> Result<Vec<NoteDegree>> {
        self.get_vault(vault_id)?;
        self.views()
            .hubs(vault_id, self.config.hub_threshold, Some(limit))
    }

    pub fn get_orphan_notes(
        &self,
        vault_id: &VaultId,
        limit: Option<usize>,
    ) -> Result<Vec<NoteDegree>> {
        self.get_vault(vault_id)?;
        self.views().orphans(vault_id, limit)
    }

    pub fn get_broken_references(
        &self,
        vault_id: &VaultId,
        limit: Option<usize>,
    ) -> Result<Vec<BrokenReference>> {
        self.get_vault(vault_id)?;
        self.views().broken(vault_id, limit)
    }

    pub fn get_graph(&self, vault_id: &VaultId) -> Result<KnowledgeGraph> {
        self.engine.build_graph(vault_id)
    }

    /// Induced subgraph around a note; `None` uses the configured radius
    pub fn get_neighborhood(
        &self,
        note_id: &NoteId,
        radius: Option<usize>,
    ) -> Result<KnowledgeGraph> {
        let radius = radius.unwrap_or(self.config.neighborhood_radius);
        self.engine.neighborhood(note_id, radius)
    }

    /// Clusters at the configured minimum size
    pub fn get_clusters(&self, vault_id: &VaultId) -> Result<Vec<BTreeSet<NoteId>>> {
        self.views()
            .clusters(vault_id, self.config.cluster_min_size)
    }

    pub fn tag_stats(&self, vault_id: &VaultId, limit: Option<usize>) -> Result<Vec<TagCount>> {
        self.get_vault(vault_id)?;
        self.views().tag_stats(vault_id, limit)
    }

    pub fn link_distribution(&self, vault_id: &VaultId) -> Result<LinkDistribution> {
        self.get_vault(vault_id)?;
        self.views().link_distribution(vault_id)
    }

    pub fn scan_history(&self, vault_id: &VaultId, limit: Option<usize>) -> Result<Vec<ScanRecord>> {
        self.get_vault(vault_id)?;
        Ok(self.store.scan_history(vault_id, limit)?)
    }

    /// Totals, structural counts and live graph shape for one vault
    #[instrument(skip(self), fields(vault = %vault_id), name = "kb_vault_stats")]
    pub fn vault_stats(&self, vault_id: &VaultId) -> Result<VaultStats> {
        let vault = self.get_vault(vault_id)?;
        let counts = self.store.vault_counts(vault_id)?;
        let degrees = self.store.note_degrees(vault_id)?;
        let graph = self.engine.build_graph(vault_id)?;

        let per_note = |total: usize| {
            if counts.notes == 0 {
                0.0
            } else {
                total as f64 / counts.notes as f64
            }
        };

        Ok(VaultStats {
            vault_id: vault.id,
            vault_name: vault.name,
            total_notes: counts.notes,
            total_references: counts.references,
            total_tags: counts.tag_associations,
            unique_tags: counts.unique_tags,
            orphan_notes: degrees.iter().filter(|d| d.is_orphan()).count(),
            hub_notes: degrees
                .iter()
                .filter(|d| d.is_hub(self.config.hub_threshold))
                .count(),
            broken_references: counts.broken_references,
            avg_references_per_note: per_note(counts.references),
            avg_words_per_note: per_note(counts.total_words),
            graph_density: graph.density(),
            largest_component_size: graph.components().first().map_or(0, BTreeSet::len),
        })
    }

    /// Vault directories under `root`
    pub fn discover_vaults(&self, root: &Path) -> Result<Vec<PathBuf>> {
        vaultgraph_vault::discover_vaults(root, &self.config.marker_dir)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Write API
    // ─────────────────────────────────────────────────────────────────────

    pub async fn ingest(
        &self,
        vault_path: &Path,
        name: Option<&str>,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<ScanStats> {
        self.ingestor.ingest(vault_path, name, on_progress).await
    }

    pub async fn ingest_with_cancel(
        &self,
        vault_path: &Path,
        name: Option<&str>,
        on_progress: Option<ProgressFn<'_>>,
        cancel: &CancellationToken,
    ) -> Result<ScanStats> {
        self.ingestor
            .ingest_with_cancel(vault_path, name, on_progress, cancel)
            .await
    }

    pub fn resolve_all(&self, vault_id: &VaultId) -> Result<ResolutionStats> {
        self.get_vault(vault_id)?;
        self.resolver.resolve_all(vault_id).map_err(analysis_failure)
    }

    pub fn compute_metrics(&self, vault_id: &VaultId) -> Result<MetricsSummary> {
        self.get_vault(vault_id)?;
        self.engine.compute_metrics(vault_id).map_err(analysis_failure)
    }

    /// Resolve, compute metrics and find clusters in one pass
    #[instrument(skip(self), fields(vault = %vault_id), name = "kb_analyze_vault")]
    pub fn analyze_vault(&self, vault_id: &VaultId) -> Result<AnalysisReport> {
        let vault = self.get_vault(vault_id)?;
        let links = self.resolve_all(vault_id)?;
        let metrics = self.compute_metrics(vault_id)?;
        let clusters = self
            .engine
            .find_clusters(vault_id, self.config.cluster_min_size)
            .map_err(analysis_failure)?;

        let report = AnalysisReport {
            vault_id: vault.id,
            vault_name: vault.name,
            links_resolved: links.resolved,
            links_broken: links.broken,
            total_notes: metrics.notes,
            total_edges: metrics.edges,
            graph_density: metrics.density,
            clusters_found: clusters.len(),
            largest_cluster_size: clusters.iter().map(BTreeSet::len).max().unwrap_or(0),
        };
        log::info!(
            "Analyzed vault {}: {} resolved, {} broken, {} clusters",
            report.vault_name,
            report.links_resolved,
            report.links_broken,
            report.clusters_found
        );
        Ok(report)
    }

    /// Explicitly delete a vault with all of its notes and history
    pub fn delete_vault(&self, vault_id: &VaultId) -> Result<()> {
        if !self.store.delete_vault(vault_id)? {
            return Err(Error::vault_not_found(vault_id.as_str()));
        }
        log::info!("Deleted vault {}", vault_id);
        Ok(())
    }
}

fn analysis_failure(e: Error) -> Error {
    match e {
        Error::VaultNotFound { .. } | Error::NoteNotFound { .. } | Error::AnalysisFailure { .. } => e,
        other => Error::analysis_failure(other.to_string()),
    }
}
