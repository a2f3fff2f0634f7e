//! Reference resolution.
//!
//! Resolution is a full recomputation: every reference of the vault is
//! re-resolved against a [`LinkIndex`] built for that single call and then
//! dropped. Prior resolution state is never consulted.
//!
//! Lookup keys, in priority order:
//!
//! 1. vault-relative path without the note extension (`Folder/Note`)
//! 2. note title
//! 3. bare file stem (`Note`)
//!
//! Lower tiers never overwrite a higher one. Within the title and stem tiers
//! the first note in path order wins, so two `Note.md` files in different
//! folders both answer to `[[Folder/Note]]` but only the alphabetically
//! first answers to `[[Note]]`.

use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use vaultgraph_core::utils::{normalize_slash_path, strip_extension};
use vaultgraph_core::{Error, Note, NoteId, ReferenceTarget, ResolutionStats, Result, VaultId};
use vaultgraph_store::ContentStore;

/// Per-run lookup table from link text to note id
#[derive(Debug, Default)]
pub struct LinkIndex {
    keys: HashMap<String, NoteId>,
    extension: String,
}

impl LinkIndex {
    /// Index `notes` (expected in path order) for notes with `extension`
    pub fn build(notes: &[Note], extension: &str) -> Self {
        let mut keys = HashMap::with_capacity(notes.len() * 3);

        for note in notes {
            keys.insert(
                strip_extension(&note.path, extension).to_string(),
                note.id.clone(),
            );
        }
        for note in notes {
            if !note.title.is_empty() {
                keys.entry(note.title.clone())
                    .or_insert_with(|| note.id.clone());
            }
        }
        for note in notes {
            keys.entry(note.file_stem().to_string())
                .or_insert_with(|| note.id.clone());
        }

        Self {
            keys,
            extension: extension.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolve raw link text written in a note that lives in `source_dir`.
    ///
    /// Heading (`#`) and block (`^`) anchors are dropped first; a link that
    /// is only an anchor does not name a note and stays unresolved.
    pub fn resolve(&self, target: &str, source_dir: &str) -> Option<NoteId> {
        let cleaned = target
            .find(['#', '^'])
            .map_or(target, |idx| &target[..idx])
            .trim();
        if cleaned.is_empty() {
            return None;
        }

        if let Some(id) = self.keys.get(cleaned) {
            return Some(id.clone());
        }

        let stripped = strip_extension(cleaned, &self.extension);
        if stripped != cleaned
            && let Some(id) = self.keys.get(stripped)
        {
            return Some(id.clone());
        }

        let joined = if source_dir.is_empty() {
            stripped.to_string()
        } else {
            format!("{}/{}", source_dir, stripped)
        };
        normalize_slash_path(&joined).and_then(|path| self.keys.get(&path).cloned())
    }
}

/// Batch resolver turning raw references into graph edges
pub struct ReferenceResolver {
    store: Arc<ContentStore>,
    extension: String,
}

impl ReferenceResolver {
    pub fn new(store: Arc<ContentStore>, extension: impl Into<String>) -> Self {
        Self {
            store,
            extension: extension.into(),
        }
    }

    /// Re-resolve every reference of the vault and persist the outcomes
    #[instrument(skip(self), fields(vault = %vault_id), name = "resolve_all")]
    pub fn resolve_all(&self, vault_id: &VaultId) -> Result<ResolutionStats> {
        if self.store.get_vault(vault_id)?.is_none() {
            return Err(Error::vault_not_found(vault_id.as_str()));
        }

        let notes = self.store.get_notes_by_vault(vault_id, None, None)?;
        let index = LinkIndex::build(&notes, &self.extension);
        debug!("Built link index with {} keys for {} notes", index.len(), notes.len());

        let directories: HashMap<&NoteId, &str> =
            notes.iter().map(|n| (&n.id, n.directory())).collect();

        let references = self.store.get_references_for_vault(vault_id)?;
        let mut stats = ResolutionStats {
            total_references: references.len(),
            ..ResolutionStats::default()
        };

        let updates: Vec<(String, ReferenceTarget)> = references
            .into_iter()
            .map(|reference| {
                let source_dir = directories
                    .get(&reference.source_note_id)
                    .copied()
                    .unwrap_or("");
                let target = match index.resolve(&reference.target_text, source_dir) {
                    Some(id) => {
                        stats.resolved += 1;
                        ReferenceTarget::Internal(id)
                    }
                    None => {
                        stats.broken += 1;
                        ReferenceTarget::Broken
                    }
                };
                (reference.id, target)
            })
            .collect();

        self.store.update_reference_targets(&updates)?;

        info!(
            "Resolved references for vault {}: {} total, {} resolved, {} broken",
            vault_id, stats.total_references, stats.resolved, stats.broken
        );
        Ok(stats)
    }
}
