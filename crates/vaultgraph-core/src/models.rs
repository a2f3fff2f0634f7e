//! Core data models for vaults, notes, references and graph metrics.
//!
//! These types are designed to be:
//! - **Serializable**: All types derive Serialize/Deserialize
//! - **Type-Safe**: Enums replace string discriminators
//! - **Deterministic**: identifiers are derived from paths, never generated

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::utils::stable_id;

/// Ordered, schema-less front-matter bag.
///
/// Consumers must tolerate missing and extra keys.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Identifier of a vault: stable hash of its absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultId(String);

impl VaultId {
    /// Derive the id for an absolute vault path
    pub fn for_path(path: &Path) -> Self {
        Self(stable_id(&path.to_string_lossy()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for VaultId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for VaultId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a note: stable hash of `(vault_id, relative_path)`.
///
/// Rescans reproduce the same id for the same path, which is what lets
/// references resolve consistently without an id-mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Derive the id for a note at `relative_path` inside `vault`
    pub fn for_path(vault: &VaultId, relative_path: &str) -> Self {
        Self(stable_id(&format!("{}:{}", vault, relative_path)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered vault
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vault {
    pub id: VaultId,
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub last_scanned: Option<DateTime<Utc>>,
}

/// A note record as persisted by the content store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub vault_id: VaultId,
    /// Vault-relative path with `/` separators
    pub path: String,
    pub title: String,
    pub content_hash: String,
    pub word_count: usize,
    pub char_count: usize,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub metadata: Metadata,
}

impl Note {
    /// File name without extension
    pub fn file_stem(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// Directory part of the relative path (empty at vault root)
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }
}

/// Resolution state of a reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "lowercase")]
pub enum ReferenceTarget {
    /// Freshly ingested, not yet seen by the resolver
    Pending,
    /// Resolved to a note in the same vault
    Internal(NoteId),
    /// No note matches the raw target text
    Broken,
}

impl ReferenceTarget {
    /// Persisted discriminator (`internal` or `broken`)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pending | Self::Internal(_) => "internal",
            Self::Broken => "broken",
        }
    }

    /// Target note id, when resolved
    pub fn note_id(&self) -> Option<&NoteId> {
        match self {
            Self::Internal(id) => Some(id),
            _ => None,
        }
    }

    /// Rebuild from the persisted `(kind, target_note_id)` pair
    pub fn from_parts(kind: &str, target: Option<String>) -> Self {
        match (kind, target) {
            ("broken", _) => Self::Broken,
            (_, Some(id)) => Self::Internal(NoteId::from(id)),
            (_, None) => Self::Pending,
        }
    }
}

/// A `[[link]]` found inside a note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub source_note_id: NoteId,
    /// Position among the source note's references (document order)
    pub ordinal: usize,
    /// Raw target text as written, e.g. `Folder/Note#Heading`
    pub target_text: String,
    pub display_text: Option<String>,
    pub target: ReferenceTarget,
}

impl Reference {
    /// Deterministic reference id for the `ordinal`-th link of a note
    pub fn id_for(source: &NoteId, ordinal: usize) -> String {
        stable_id(&format!("{}#{}", source, ordinal))
    }

    pub fn is_broken(&self) -> bool {
        matches!(self.target, ReferenceTarget::Broken)
    }
}

/// Per-note graph metrics from the last computation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub note_id: NoteId,
    pub pagerank: f64,
    pub in_degree: usize,
    pub out_degree: usize,
    pub betweenness: f64,
    pub closeness: f64,
    pub clustering_coefficient: f64,
    /// `None` until the first computation pass
    pub computed_at: Option<DateTime<Utc>>,
}

impl GraphMetrics {
    /// Zero-valued row, as created alongside a new note
    pub fn zeroed(note_id: NoteId) -> Self {
        Self {
            note_id,
            pagerank: 0.0,
            in_degree: 0,
            out_degree: 0,
            betweenness: 0.0,
            closeness: 0.0,
            clustering_coefficient: 0.0,
            computed_at: None,
        }
    }

    pub fn total_degree(&self) -> usize {
        self.in_degree + self.out_degree
    }
}

/// Status of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Append-only audit record of one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub vault_id: VaultId,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: ScanStatus,
    pub notes_scanned: usize,
    pub notes_added: usize,
    pub notes_updated: usize,
    pub notes_deleted: usize,
    pub duration_seconds: Option<f64>,
    pub error_message: Option<String>,
}

/// Counters written when a scan completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCounts {
    pub notes_scanned: usize,
    pub notes_added: usize,
    pub notes_updated: usize,
    pub notes_deleted: usize,
}

/// How a note upsert compared against the stored row.
///
/// Reporting only; unchanged notes are still rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Added,
    Updated,
    Unchanged,
}

/// A raw `[[target|display]]` occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReference {
    pub target: String,
    pub display: Option<String>,
}

/// Normalized parser output for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedNote {
    /// Vault-relative path with `/` separators
    pub path: String,
    pub title: String,
    /// Full raw document text (hashed for change detection)
    pub content: String,
    /// Document text after the front-matter block
    pub body: String,
    pub front_matter: Metadata,
    pub tags: BTreeSet<String>,
    pub references: Vec<RawReference>,
    pub word_count: usize,
    pub char_count: usize,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Recoverable oddities (malformed front matter, bad dates)
    pub warnings: Vec<String>,
}

/// Progress report emitted after each ingestion batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub processed: usize,
    pub total: usize,
}

/// Result of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub vault_id: Option<VaultId>,
    pub notes_scanned: usize,
    pub notes_added: usize,
    pub notes_updated: usize,
    pub notes_unchanged: usize,
    pub references_found: usize,
    pub tags_found: usize,
    pub duration_seconds: f64,
    pub cancelled: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ScanStats {
    /// Whether every discovered file was ingested
    pub fn success(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }
}

/// Totals from one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub total_references: usize,
    pub resolved: usize,
    pub broken: usize,
}

/// Totals from one metrics pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub notes: usize,
    pub edges: usize,
    pub density: f64,
}

/// A note with its live degree counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDegree {
    pub note_id: NoteId,
    pub path: String,
    pub title: String,
    pub in_degree: usize,
    pub out_degree: usize,
}

impl NoteDegree {
    pub fn total_degree(&self) -> usize {
        self.in_degree + self.out_degree
    }

    pub fn is_orphan(&self) -> bool {
        self.in_degree == 0 && self.out_degree == 0
    }

    pub fn is_hub(&self, threshold: usize) -> bool {
        self.total_degree() >= threshold
    }
}

/// A reference whose target could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenReference {
    pub reference_id: String,
    pub source_note_id: NoteId,
    pub source_path: String,
    pub source_title: String,
    pub target_text: String,
    pub display_text: Option<String>,
}

/// Tag usage within a vault (derived, never stored)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub note_count: usize,
}

/// Global store counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub vaults: usize,
    pub notes: usize,
    pub references: usize,
    pub broken_references: usize,
    pub tags: usize,
    pub scans: usize,
}
