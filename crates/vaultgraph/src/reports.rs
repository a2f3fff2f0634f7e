//! Serializable summaries returned by the facade.

use serde::{Deserialize, Serialize};
use vaultgraph_core::VaultId;

/// Outcome of resolve + metrics + clustering for one vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub vault_id: VaultId,
    pub vault_name: String,
    pub links_resolved: usize,
    pub links_broken: usize,
    pub total_notes: usize,
    pub total_edges: usize,
    pub graph_density: f64,
    pub clusters_found: usize,
    pub largest_cluster_size: usize,
}

/// Vault-wide totals and structural counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultStats {
    pub vault_id: VaultId,
    pub vault_name: String,
    pub total_notes: usize,
    pub total_references: usize,
    /// Note/tag associations
    pub total_tags: usize,
    pub unique_tags: usize,
    pub orphan_notes: usize,
    pub hub_notes: usize,
    pub broken_references: usize,
    pub avg_references_per_note: f64,
    pub avg_words_per_note: f64,
    pub graph_density: f64,
    pub largest_component_size: usize,
}

/// Number of notes per total-degree bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDistribution {
    #[serde(rename = "0-2")]
    pub sparse: usize,
    #[serde(rename = "3-5")]
    pub light: usize,
    #[serde(rename = "6-10")]
    pub moderate: usize,
    #[serde(rename = "11+")]
    pub dense: usize,
}

impl LinkDistribution {
    /// Count one note of the given total degree
    pub fn record(&mut self, degree: usize) {
        match degree {
            0..=2 => self.sparse += 1,
            3..=5 => self.light += 1,
            6..=10 => self.moderate += 1,
            _ => self.dense += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.sparse + self.light + self.moderate + self.dense
    }
}
