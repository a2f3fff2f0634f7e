//! Derived read-only views: hubs, orphans, broken references, clusters.
//!
//! Degree-based views count the currently stored resolved references, so
//! they are accurate right after resolution without a metrics pass.

use std::collections::BTreeSet;
use vaultgraph_core::{BrokenReference, NoteDegree, NoteId, Result, TagCount, VaultId};
use vaultgraph_graph::GraphEngine;
use vaultgraph_store::ContentStore;

use crate::reports::LinkDistribution;

pub struct DerivedViews<'a> {
    store: &'a ContentStore,
    engine: &'a GraphEngine,
}

impl<'a> DerivedViews<'a> {
    pub fn new(store: &'a ContentStore, engine: &'a GraphEngine) -> Self {
        Self { store, engine }
    }

    /// Notes with `in + out >= threshold`, most connected first
    pub fn hubs(
        &self,
        vault_id: &VaultId,
        threshold: usize,
        limit: Option<usize>,
    ) -> Result<Vec<NoteDegree>> {
        let mut hubs: Vec<NoteDegree> = self
            .store
            .note_degrees(vault_id)?
            .into_iter()
            .filter(|n| n.is_hub(threshold))
            .collect();
        hubs.sort_by(|a, b| {
            b.total_degree()
                .cmp(&a.total_degree())
                .then_with(|| a.path.cmp(&b.path))
        });
        truncate(&mut hubs, limit);
        Ok(hubs)
    }

    /// Notes with no resolved references in either direction, by path
    pub fn orphans(&self, vault_id: &VaultId, limit: Option<usize>) -> Result<Vec<NoteDegree>> {
        let mut orphans: Vec<NoteDegree> = self
            .store
            .note_degrees(vault_id)?
            .into_iter()
            .filter(NoteDegree::is_orphan)
            .collect();
        truncate(&mut orphans, limit);
        Ok(orphans)
    }

    pub fn broken(&self, vault_id: &VaultId, limit: Option<usize>) -> Result<Vec<BrokenReference>> {
        Ok(self.store.broken_references(vault_id, limit)?)
    }

    pub fn clusters(&self, vault_id: &VaultId, min_size: usize) -> Result<Vec<BTreeSet<NoteId>>> {
        self.engine.find_clusters(vault_id, min_size)
    }

    pub fn link_distribution(&self, vault_id: &VaultId) -> Result<LinkDistribution> {
        let mut distribution = LinkDistribution::default();
        for degree in self.store.note_degrees(vault_id)? {
            distribution.record(degree.total_degree());
        }
        Ok(distribution)
    }

    pub fn tag_stats(&self, vault_id: &VaultId, limit: Option<usize>) -> Result<Vec<TagCount>> {
        Ok(self.store.vault_tag_stats(vault_id, limit)?)
    }
}

fn truncate<T>(items: &mut Vec<T>, limit: Option<usize>) {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
}
