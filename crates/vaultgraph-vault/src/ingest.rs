//! Batched vault ingestion.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::instrument;
use vaultgraph_core::utils::to_slash_path;
use vaultgraph_core::{
    EngineConfig, Error, Result, ScanCounts, ScanProgress, ScanStats, UpsertOutcome, Vault,
};
use vaultgraph_parser::{DocumentParser, FileTimes};
use vaultgraph_store::{ContentStore, NoteWrite};

use crate::discovery::note_files;

/// Callback invoked after each batch
pub type ProgressFn<'a> = &'a (dyn Fn(ScanProgress) + Send + Sync);

const CANCELLED: &str = "cancelled";

/// Walks a vault and writes every note through the content store.
///
/// References are stored unresolved; resolution is a separate pass run after
/// the whole vault has been written, so forward links are never judged
/// against a half-ingested vault.
pub struct VaultIngestor {
    store: Arc<ContentStore>,
    parser: DocumentParser,
    marker_dir: String,
    extension: String,
    batch_size: usize,
}

struct FileOutcome {
    write: NoteWrite,
    warnings: Vec<String>,
}

impl VaultIngestor {
    pub fn new(store: Arc<ContentStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            parser: DocumentParser::new(),
            marker_dir: config.marker_dir.clone(),
            extension: config.extension().to_string(),
            batch_size: config.batch_size.max(1),
        }
    }

    /// Ingest the vault at `vault_path`.
    ///
    /// Per-file failures land in [`ScanStats::errors`]; only vault-level
    /// problems are returned as errors.
    pub async fn ingest(
        &self,
        vault_path: &Path,
        name: Option<&str>,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<ScanStats> {
        self.ingest_with_cancel(vault_path, name, on_progress, &CancellationToken::new())
            .await
    }

    /// Like [`ingest`](Self::ingest), checking `cancel` between batches.
    ///
    /// Batches committed before cancellation stay in the store.
    #[instrument(skip(self, on_progress, cancel), fields(vault = ?vault_path), name = "vault_ingest")]
    pub async fn ingest_with_cancel(
        &self,
        vault_path: &Path,
        name: Option<&str>,
        on_progress: Option<ProgressFn<'_>>,
        cancel: &CancellationToken,
    ) -> Result<ScanStats> {
        let root = self.check_vault(vault_path).await?;
        let started = Instant::now();

        let vault = self.store.upsert_vault(&root, name).map_err(|e| scan_failure(&root, e))?;
        let scan_id = self
            .store
            .record_scan_start(&vault.id)
            .map_err(|e| scan_failure(&root, e))?;
        log::info!("Starting scan {} of vault {} at {}", scan_id, vault.name, root.display());

        let files = {
            let root = root.clone();
            let extension = self.extension.clone();
            tokio::task::spawn_blocking(move || note_files(&root, &extension)).await
        };
        let files = match files {
            Ok(files) => files,
            Err(e) => {
                let reason = format!("file walk failed: {}", e);
                return Err(self.abort_scan(scan_id, &root, &ScanStats::default(), reason));
            }
        };
        let total = files.len();
        log::info!("Found {} note files", total);

        let mut stats = ScanStats {
            vault_id: Some(vault.id.clone()),
            ..ScanStats::default()
        };
        let mut processed = 0usize;

        for batch in files.chunks(self.batch_size) {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }
            if !is_dir(&root).await {
                let reason = "vault directory is no longer accessible";
                return Err(self.abort_scan(scan_id, &root, &stats, reason));
            }

            for file in batch {
                if let Err(e) = self.ingest_one(&root, &vault, file, &mut stats).await {
                    return Err(self.abort_scan(scan_id, &root, &stats, e));
                }
                processed += 1;
            }

            log::debug!("Processed {}/{} files", processed, total);
            if let Some(report) = on_progress {
                report(ScanProgress { processed, total });
            }
            tokio::task::yield_now().await;
        }

        stats.duration_seconds = started.elapsed().as_secs_f64();

        if stats.cancelled {
            log::warn!(
                "Scan of {} cancelled after {}/{} files",
                root.display(),
                processed,
                total
            );
            self.store
                .record_scan_fail(scan_id, CANCELLED, counts(&stats))
                .map_err(|e| scan_failure(&root, e))?;
            return Ok(stats);
        }

        if let Err(e) = self.store.update_vault_scan_time(&vault.id, chrono::Utc::now()) {
            return Err(self.abort_scan(scan_id, &root, &stats, e));
        }
        if let Err(e) = self.store.record_scan_complete(scan_id, counts(&stats)) {
            return Err(self.abort_scan(scan_id, &root, &stats, e));
        }

        log::info!(
            "Scan complete: {} scanned, {} added, {} updated, {} unchanged, {} errors in {:.2}s",
            stats.notes_scanned,
            stats.notes_added,
            stats.notes_updated,
            stats.notes_unchanged,
            stats.errors.len(),
            stats.duration_seconds
        );
        Ok(stats)
    }

    /// Mark the scan failed (best effort) and build the vault-level error
    fn abort_scan(
        &self,
        scan_id: i64,
        root: &Path,
        stats: &ScanStats,
        reason: impl std::fmt::Display,
    ) -> Error {
        let reason = reason.to_string();
        if let Err(e) = self.store.record_scan_fail(scan_id, &reason, counts(stats)) {
            log::warn!("Could not record failed scan {}: {}", scan_id, e);
        }
        log::error!("Aborting scan of {}: {}", root.display(), reason);
        scan_failure(root, reason)
    }

    /// Canonical vault root, or the precondition error
    async fn check_vault(&self, vault_path: &Path) -> Result<PathBuf> {
        let root = tokio::fs::canonicalize(vault_path)
            .await
            .map_err(|_| Error::vault_not_found(vault_path.display().to_string()))?;
        if !is_dir(&root).await {
            return Err(Error::vault_not_found(vault_path.display().to_string()));
        }
        if !is_dir(&root.join(&self.marker_dir)).await {
            return Err(Error::not_a_vault(root, self.marker_dir.clone()));
        }
        Ok(root)
    }

    /// Per-file failures are recorded in `stats`; a store failure is returned
    async fn ingest_one(
        &self,
        root: &Path,
        vault: &Vault,
        file: &Path,
        stats: &mut ScanStats,
    ) -> Result<()> {
        let display = file.strip_prefix(root).unwrap_or(file).display().to_string();
        match self.ingest_file(root, vault, file).await {
            Ok(outcome) => {
                stats.notes_scanned += 1;
                match outcome.write.outcome {
                    UpsertOutcome::Added => stats.notes_added += 1,
                    UpsertOutcome::Updated => stats.notes_updated += 1,
                    UpsertOutcome::Unchanged => stats.notes_unchanged += 1,
                }
                stats.references_found += outcome.write.references;
                stats.tags_found += outcome.write.tags;
                stats
                    .warnings
                    .extend(outcome.warnings.into_iter().map(|w| format!("{}: {}", display, w)));
                Ok(())
            }
            Err(e @ Error::Store { .. }) => Err(e),
            Err(e) => {
                log::warn!("Failed to ingest {}: {}", display, e);
                stats.errors.push(format!("{}: {}", display, e));
                Ok(())
            }
        }
    }

    async fn ingest_file(&self, root: &Path, vault: &Vault, file: &Path) -> Result<FileOutcome> {
        let relative = file
            .strip_prefix(root)
            .map(to_slash_path)
            .map_err(|_| Error::parse_error(file, "file is outside the vault root"))?;

        let content = tokio::fs::read_to_string(file).await?;
        let metadata = tokio::fs::metadata(file).await?;

        let parsed = self
            .parser
            .parse(&relative, &content, FileTimes::from_metadata(&metadata));
        let warnings = parsed.warnings.clone();
        let write = self.store.write_note(&vault.id, &parsed)?;

        log::debug!(
            "Ingested {}: {:?}, {} references, {} tags",
            relative,
            write.outcome,
            write.references,
            write.tags
        );
        Ok(FileOutcome { write, warnings })
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

fn counts(stats: &ScanStats) -> ScanCounts {
    ScanCounts {
        notes_scanned: stats.notes_scanned,
        notes_added: stats.notes_added,
        notes_updated: stats.notes_updated,
        notes_deleted: 0,
    }
}

fn scan_failure(root: &Path, e: impl std::fmt::Display) -> Error {
    Error::scan_failure(root.display().to_string(), e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use vaultgraph_core::ConfigProfile;

    fn vault_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".obsidian")).unwrap();
        dir
    }

    fn ingestor() -> (Arc<ContentStore>, VaultIngestor) {
        let store = Arc::new(ContentStore::open_in_memory().unwrap());
        let config = ConfigProfile::Testing.create_config();
        (store.clone(), VaultIngestor::new(store, &config))
    }

    #[tokio::test]
    async fn test_missing_marker_writes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.md"), "hello").unwrap();
        let (store, ingestor) = ingestor();

        let err = ingestor.ingest(dir.path(), None, None).await.unwrap_err();
        assert!(matches!(err, Error::NotAVault { .. }));
        assert!(store.list_vaults().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_path() {
        let (_, ingestor) = ingestor();
        let err = ingestor
            .ingest(Path::new("/no/such/vault"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VaultNotFound { .. }));
    }

    #[tokio::test]
    async fn test_counts_and_progress() {
        let dir = vault_dir();
        for (name, body) in [
            ("A.md", "#one [[B]] [[C]]"),
            ("B.md", "#one #two"),
            ("C.md", "plain"),
        ] {
            fs::write(dir.path().join(name), body).unwrap();
        }
        let (_, ingestor) = ingestor();

        let reports = std::sync::Mutex::new(Vec::new());
        let record = |p: ScanProgress| reports.lock().unwrap().push(p);
        let progress: ProgressFn<'_> = &record;
        let stats = ingestor
            .ingest(dir.path(), Some("Test"), Some(progress))
            .await
            .unwrap();

        assert!(stats.success());
        assert_eq!(stats.notes_scanned, 3);
        assert_eq!(stats.notes_added, 3);
        assert_eq!(stats.references_found, 2);
        assert_eq!(stats.tags_found, 3);

        // testing profile batches two files at a time
        let reports = reports.into_inner().unwrap();
        assert_eq!(
            reports,
            vec![
                ScanProgress { processed: 2, total: 3 },
                ScanProgress { processed: 3, total: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_unreadable_file_is_isolated() {
        let dir = vault_dir();
        fs::write(dir.path().join("good.md"), "fine").unwrap();
        fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        let (store, ingestor) = ingestor();

        let stats = ingestor.ingest(dir.path(), None, None).await.unwrap();
        assert_eq!(stats.notes_scanned, 1);
        assert_eq!(stats.errors.len(), 1);
        assert!(stats.errors[0].starts_with("bad.md"));

        let vault = stats.vault_id.unwrap();
        let history = store.scan_history(&vault, None).unwrap();
        assert_eq!(history[0].status, vaultgraph_core::ScanStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_batch() {
        let dir = vault_dir();
        fs::write(dir.path().join("A.md"), "a").unwrap();
        let (store, ingestor) = ingestor();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = ingestor
            .ingest_with_cancel(dir.path(), None, None, &cancel)
            .await
            .unwrap();
        assert!(stats.cancelled);
        assert!(!stats.success());
        assert_eq!(stats.notes_scanned, 0);

        let vault = stats.vault_id.unwrap();
        let scan = &store.scan_history(&vault, None).unwrap()[0];
        assert_eq!(scan.status, vaultgraph_core::ScanStatus::Failed);
        assert_eq!(scan.error_message.as_deref(), Some("cancelled"));
        assert!(store.get_vault(&vault).unwrap().unwrap().last_scanned.is_none());
    }
}
