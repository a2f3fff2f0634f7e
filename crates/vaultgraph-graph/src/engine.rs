//! Graph construction and metrics over the content store.

use chrono::Utc;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;
use vaultgraph_core::{
    EngineConfig, Error, GraphMetrics, MetricsSummary, NoteId, ReferenceTarget, Result, VaultId,
};
use vaultgraph_store::ContentStore;

use crate::algorithms::{AlgorithmError, GraphAlgorithms, Scores, StandardAlgorithms};
use crate::graph::{GraphNode, KnowledgeGraph};

/// Builds request-scoped graphs and persists per-note metrics
pub struct GraphEngine {
    store: Arc<ContentStore>,
    algorithms: Box<dyn GraphAlgorithms>,
}

impl GraphEngine {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self::with_algorithms(store, Box::new(StandardAlgorithms::default()))
    }

    pub fn from_config(store: Arc<ContentStore>, config: &EngineConfig) -> Self {
        Self::with_algorithms(store, Box::new(StandardAlgorithms::from_config(config)))
    }

    pub fn with_algorithms(store: Arc<ContentStore>, algorithms: Box<dyn GraphAlgorithms>) -> Self {
        Self { store, algorithms }
    }

    /// One node per note, one edge per resolved reference
    #[instrument(skip(self), fields(vault = %vault_id), name = "graph_build")]
    pub fn build_graph(&self, vault_id: &VaultId) -> Result<KnowledgeGraph> {
        if self.store.get_vault(vault_id)?.is_none() {
            return Err(Error::vault_not_found(vault_id.as_str()));
        }

        let mut graph = KnowledgeGraph::new();
        for note in self.store.get_notes_by_vault(vault_id, None, None)? {
            graph.add_node(GraphNode::from(&note));
        }

        let mut skipped = 0usize;
        for reference in self.store.get_references_for_vault(vault_id)? {
            if let ReferenceTarget::Internal(target) = &reference.target
                && !graph.add_edge(&reference.source_note_id, target, reference.id.clone())
            {
                skipped += 1;
            }
        }
        if skipped > 0 {
            warn!("Skipped {} references pointing outside vault {}", skipped, vault_id);
        }

        debug!(
            "Built graph for vault {}: {} nodes, {} edges",
            vault_id,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Compute and persist metrics for every note of the vault.
    ///
    /// Each algorithm fails independently: a failing one leaves its column
    /// at zero for every note and the others are still stored.
    #[instrument(skip(self), fields(vault = %vault_id), name = "graph_compute_metrics")]
    pub fn compute_metrics(&self, vault_id: &VaultId) -> Result<MetricsSummary> {
        let graph = self.build_graph(vault_id)?;
        if graph.is_empty() {
            return Ok(MetricsSummary::default());
        }

        let n = graph.node_count();
        let pagerank = absorb("pagerank", n, self.algorithms.pagerank(&graph));
        let betweenness = absorb("betweenness", n, self.algorithms.betweenness(&graph));
        let closeness = absorb("closeness", n, self.algorithms.closeness(&graph));
        let clustering = absorb("clustering", n, self.algorithms.clustering(&graph));

        let computed_at = Utc::now();
        let metrics: Vec<GraphMetrics> = graph
            .nodes()
            .enumerate()
            .map(|(i, node)| GraphMetrics {
                note_id: node.id.clone(),
                pagerank: pagerank[i],
                in_degree: graph.in_degree(&node.id),
                out_degree: graph.out_degree(&node.id),
                betweenness: betweenness[i],
                closeness: closeness[i],
                clustering_coefficient: clustering[i],
                computed_at: Some(computed_at),
            })
            .collect();
        self.store.replace_metrics(&metrics)?;

        let summary = MetricsSummary {
            notes: n,
            edges: graph.edge_count(),
            density: graph.density(),
        };
        info!(
            "Computed metrics for vault {}: {} notes, {} edges, density {:.4}",
            vault_id, summary.notes, summary.edges, summary.density
        );
        Ok(summary)
    }

    /// Connected components with at least `min_size` members, largest first
    #[instrument(skip(self), fields(vault = %vault_id), name = "graph_find_clusters")]
    pub fn find_clusters(&self, vault_id: &VaultId, min_size: usize) -> Result<Vec<BTreeSet<NoteId>>> {
        let graph = self.build_graph(vault_id)?;
        Ok(graph
            .components()
            .into_iter()
            .filter(|component| component.len() >= min_size)
            .collect())
    }

    /// Induced subgraph within `radius` hops of a note.
    ///
    /// A note without links yields a single-node graph; check
    /// [`KnowledgeGraph::is_isolated_node`] before reporting it as empty.
    #[instrument(skip(self), fields(note = %note_id), name = "graph_neighborhood")]
    pub fn neighborhood(&self, note_id: &NoteId, radius: usize) -> Result<KnowledgeGraph> {
        let note = self
            .store
            .get_note(note_id)?
            .ok_or_else(|| Error::note_not_found(note_id.as_str()))?;
        let graph = self.build_graph(&note.vault_id)?;
        graph
            .neighborhood(note_id, radius)
            .ok_or_else(|| Error::note_not_found(note_id.as_str()))
    }
}

fn absorb(name: &str, n: usize, result: std::result::Result<Scores, AlgorithmError>) -> Scores {
    match result {
        Ok(scores) if scores.len() == n => scores,
        Ok(scores) => {
            warn!(
                "{} returned {} scores for {} nodes, using zeros",
                name,
                scores.len(),
                n
            );
            vec![0.0; n]
        }
        Err(e) => {
            warn!("{} failed, using zeros: {}", name, e);
            vec![0.0; n]
        }
    }
}
