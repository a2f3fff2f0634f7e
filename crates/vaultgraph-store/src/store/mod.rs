//! Content store implementation using SQLite.
//!
//! Persists vaults, notes, references, tags, graph metrics and the scan
//! audit trail. Every logical write runs in its own transaction; the
//! composite [`ContentStore::write_note`] applies a note, its references and
//! its tags atomically.

mod metrics_ops;
mod note_ops;
mod reference_ops;
mod scan_ops;
mod vault_ops;

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::{Result, StoreError};

pub use note_ops::NoteWrite;
pub use vault_ops::VaultCounts;

// ─────────────────────────────────────────────────────────────────────────────
// Schema Version
// ─────────────────────────────────────────────────────────────────────────────

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Content Store
// ─────────────────────────────────────────────────────────────────────────────

/// Content store backed by SQLite.
///
/// Uses WAL mode for better concurrent read performance. The store assumes
/// a single writer at a time.
pub struct ContentStore {
    /// The SQLite connection.
    pub(crate) conn: Mutex<Connection>,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Initialization
// ─────────────────────────────────────────────────────────────────────────────

impl ContentStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the database file and initializes the schema if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|_| {
                    StoreError::Database(rusqlite::Error::InvalidPath(path.to_path_buf()))
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        info!("Content store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        debug!("In-memory content store created");
        Ok(store)
    }

    /// Initialize the database with schema and pragmas.
    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Self::create_schema(&conn)
    }

    /// Create the database schema.
    fn create_schema(conn: &Connection) -> Result<()> {
        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version >= SCHEMA_VERSION {
            debug!("Schema up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating schema from version {} to {}",
            current_version, SCHEMA_VERSION
        );

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vaults (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                path TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                last_scanned TEXT
            );

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                vault_id TEXT NOT NULL REFERENCES vaults(id) ON DELETE CASCADE,
                path TEXT NOT NULL,
                title TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                word_count INTEGER NOT NULL DEFAULT 0,
                char_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                modified_at TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                UNIQUE (vault_id, path)
            );

            -- Outgoing links; target_note_id stays NULL until resolution
            CREATE TABLE IF NOT EXISTS note_references (
                id TEXT PRIMARY KEY,
                source_note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                ordinal INTEGER NOT NULL,
                target_text TEXT NOT NULL,
                display_text TEXT,
                target_note_id TEXT REFERENCES notes(id) ON DELETE SET NULL,
                kind TEXT NOT NULL DEFAULT 'internal' CHECK (kind IN ('internal', 'broken'))
            );

            CREATE INDEX IF NOT EXISTS idx_references_source
                ON note_references(source_note_id, ordinal);

            CREATE INDEX IF NOT EXISTS idx_references_target
                ON note_references(target_note_id);

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS note_tags (
                note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (note_id, tag_id)
            );

            CREATE TABLE IF NOT EXISTS graph_metrics (
                note_id TEXT PRIMARY KEY REFERENCES notes(id) ON DELETE CASCADE,
                pagerank REAL NOT NULL DEFAULT 0,
                in_degree INTEGER NOT NULL DEFAULT 0,
                out_degree INTEGER NOT NULL DEFAULT 0,
                betweenness REAL NOT NULL DEFAULT 0,
                closeness REAL NOT NULL DEFAULT 0,
                clustering_coefficient REAL NOT NULL DEFAULT 0,
                computed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS scan_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vault_id TEXT NOT NULL REFERENCES vaults(id) ON DELETE CASCADE,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                status TEXT NOT NULL,
                notes_scanned INTEGER NOT NULL DEFAULT 0,
                notes_added INTEGER NOT NULL DEFAULT 0,
                notes_updated INTEGER NOT NULL DEFAULT 0,
                notes_deleted INTEGER NOT NULL DEFAULT 0,
                duration_seconds REAL,
                error_message TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_scan_history_vault
                ON scan_history(vault_id, id);
            "#,
        )?;

        if current_version < 2 {
            Self::migrate_v2(conn)?;
        }

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        info!("Schema created (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// Migration v2: tag lookup index for per-vault tag statistics.
    fn migrate_v2(conn: &Connection) -> Result<()> {
        debug!("Running migration v2: note_tags tag index");
        conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag_id);")?;
        Ok(())
    }

    /// Execute a function within a transaction.
    ///
    /// The transaction is rolled back if the closure returns an error.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn to_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339()
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp {:?}: {}", raw, e)))
}

pub(crate) fn parse_optional_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_timestamp).transpose()
}

/// `LIMIT` value where `None` means all rows
pub(crate) fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| l as i64)
}

pub(crate) fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}
