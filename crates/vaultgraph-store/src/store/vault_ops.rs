//! Vault registration, lookup and deletion.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vaultgraph_core::{StoreStats, Vault, VaultId};

use super::{ContentStore, parse_optional_timestamp, parse_timestamp, to_count, to_timestamp};
use crate::error::Result;

/// Row counts for one vault
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCounts {
    pub notes: usize,
    pub references: usize,
    pub resolved_references: usize,
    pub broken_references: usize,
    pub unique_tags: usize,
    pub tag_associations: usize,
    pub total_words: usize,
}

const VAULT_COLUMNS: &str = "id, name, path, created_at, last_scanned";

impl ContentStore {
    /// Register a vault, or refresh an existing registration.
    ///
    /// The name defaults to the directory name on first registration and is
    /// only replaced when `name` is given.
    pub fn upsert_vault(&self, path: &Path, name: Option<&str>) -> Result<Vault> {
        let conn = self.conn.lock();

        let id = VaultId::for_path(path);
        let default_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        conn.execute(
            r#"
            INSERT INTO vaults (id, name, path, created_at)
            VALUES (?1, COALESCE(?2, ?3), ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = COALESCE(?2, vaults.name),
                path = excluded.path
            "#,
            params![
                id.as_str(),
                name,
                default_name,
                path.to_string_lossy().into_owned(),
                to_timestamp(&Utc::now()),
            ],
        )?;

        debug!("Upserted vault {} at {:?}", id, path);
        fetch_vault(&conn, &id)?.ok_or_else(|| {
            crate::StoreError::NotFound(format!("vault {} vanished after upsert", id))
        })
    }

    /// Get a vault by ID.
    pub fn get_vault(&self, id: &VaultId) -> Result<Option<Vault>> {
        let conn = self.conn.lock();
        fetch_vault(&conn, id)
    }

    /// Get a vault by its absolute path.
    pub fn get_vault_by_path(&self, path: &Path) -> Result<Option<Vault>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM vaults WHERE path = ?1", VAULT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![path.to_string_lossy().into_owned()])?;

        match rows.next()? {
            Some(row) => Ok(Some(row_to_vault(row)?)),
            None => Ok(None),
        }
    }

    /// List all registered vaults ordered by name.
    pub fn list_vaults(&self) -> Result<Vec<Vault>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM vaults ORDER BY name, path", VAULT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;

        let mut vaults = Vec::new();
        while let Some(row) = rows.next()? {
            vaults.push(row_to_vault(row)?);
        }
        Ok(vaults)
    }

    /// Record the time of the last successful scan.
    pub fn update_vault_scan_time(&self, id: &VaultId, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE vaults SET last_scanned = ?2 WHERE id = ?1",
            params![id.as_str(), to_timestamp(&at)],
        )?;
        Ok(())
    }

    /// Delete a vault and everything it owns.
    ///
    /// This is the only operation that destroys notes.
    pub fn delete_vault(&self, id: &VaultId) -> Result<bool> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute("DELETE FROM vaults WHERE id = ?1", params![id.as_str()])?;
        if rows_affected > 0 {
            info!("Deleted vault {}", id);
        }
        Ok(rows_affected > 0)
    }

    /// Row counts for one vault.
    pub fn vault_counts(&self, id: &VaultId) -> Result<VaultCounts> {
        let conn = self.conn.lock();

        let (notes, total_words): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(word_count), 0) FROM notes WHERE vault_id = ?1",
            params![id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (references, resolved, broken): (i64, i64, i64) = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(r.kind = 'internal' AND r.target_note_id IS NOT NULL), 0),
                COALESCE(SUM(r.kind = 'broken'), 0)
            FROM note_references r
            JOIN notes n ON n.id = r.source_note_id
            WHERE n.vault_id = ?1
            "#,
            params![id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let (unique_tags, associations): (i64, i64) = conn.query_row(
            r#"
            SELECT COUNT(DISTINCT nt.tag_id), COUNT(*)
            FROM note_tags nt
            JOIN notes n ON n.id = nt.note_id
            WHERE n.vault_id = ?1
            "#,
            params![id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(VaultCounts {
            notes: to_count(notes),
            references: to_count(references),
            resolved_references: to_count(resolved),
            broken_references: to_count(broken),
            unique_tags: to_count(unique_tags),
            tag_associations: to_count(associations),
            total_words: to_count(total_words),
        })
    }

    /// Global row counts.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(to_count(n))
        };

        Ok(StoreStats {
            vaults: count("SELECT COUNT(*) FROM vaults")?,
            notes: count("SELECT COUNT(*) FROM notes")?,
            references: count("SELECT COUNT(*) FROM note_references")?,
            broken_references: count(
                "SELECT COUNT(*) FROM note_references WHERE kind = 'broken'",
            )?,
            tags: count("SELECT COUNT(*) FROM tags")?,
            scans: count("SELECT COUNT(*) FROM scan_history")?,
        })
    }
}

pub(crate) fn fetch_vault(conn: &Connection, id: &VaultId) -> Result<Option<Vault>> {
    let sql = format!("SELECT {} FROM vaults WHERE id = ?1", VAULT_COLUMNS);
    let raw = conn
        .query_row(&sql, params![id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })
        .optional()?;

    raw.map(|(id, name, path, created_at, last_scanned)| {
        Ok(Vault {
            id: VaultId::from(id),
            name,
            path: PathBuf::from(path),
            created_at: parse_timestamp(&created_at)?,
            last_scanned: parse_optional_timestamp(last_scanned)?,
        })
    })
    .transpose()
}

fn row_to_vault(row: &Row) -> Result<Vault> {
    let created_at: String = row.get(3)?;
    Ok(Vault {
        id: VaultId::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        path: PathBuf::from(row.get::<_, String>(2)?),
        created_at: parse_timestamp(&created_at)?,
        last_scanned: parse_optional_timestamp(row.get(4)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> ContentStore {
        ContentStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_upsert_vault_is_idempotent() {
        let store = create_test_store();
        let path = Path::new("/vaults/Research");

        let first = store.upsert_vault(path, None).unwrap();
        assert_eq!(first.name, "Research");
        assert_eq!(first.id, VaultId::for_path(path));

        let renamed = store.upsert_vault(path, Some("Lab")).unwrap();
        assert_eq!(renamed.id, first.id);
        assert_eq!(renamed.name, "Lab");
        assert_eq!(renamed.created_at, first.created_at);

        let unnamed = store.upsert_vault(path, None).unwrap();
        assert_eq!(unnamed.name, "Lab");
        assert_eq!(store.list_vaults().unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_by_path_and_scan_time() {
        let store = create_test_store();
        let path = Path::new("/vaults/A");
        let vault = store.upsert_vault(path, None).unwrap();
        assert!(vault.last_scanned.is_none());

        let at = Utc::now();
        store.update_vault_scan_time(&vault.id, at).unwrap();

        let found = store.get_vault_by_path(path).unwrap().unwrap();
        assert_eq!(found.last_scanned, Some(at));
        assert!(store.get_vault_by_path(Path::new("/other")).unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_vault() {
        let store = create_test_store();
        assert!(!store.delete_vault(&VaultId::from("nope")).unwrap());
        assert!(store.get_vault(&VaultId::from("nope")).unwrap().is_none());
    }
}
