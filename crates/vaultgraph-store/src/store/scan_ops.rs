//! Append-only scan audit trail.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, warn};
use vaultgraph_core::{ScanCounts, ScanRecord, ScanStatus, VaultId};

use super::{ContentStore, parse_optional_timestamp, parse_timestamp, sql_limit, to_count, to_timestamp};
use crate::error::{Result, StoreError};

const SCAN_COLUMNS: &str = "id, vault_id, started_at, completed_at, status, notes_scanned, \
                            notes_added, notes_updated, notes_deleted, duration_seconds, \
                            error_message";

impl ContentStore {
    /// Open a new scan record in the `running` state.
    pub fn record_scan_start(&self, vault_id: &VaultId) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO scan_history (vault_id, started_at, status) VALUES (?1, ?2, ?3)",
            params![
                vault_id.as_str(),
                to_timestamp(&Utc::now()),
                ScanStatus::Running.as_str()
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Scan {} started for vault {}", id, vault_id);
        Ok(id)
    }

    /// Close a scan record as `completed`.
    pub fn record_scan_complete(&self, scan_id: i64, counts: ScanCounts) -> Result<ScanRecord> {
        let conn = self.conn.lock();
        let duration = elapsed_seconds(&conn, scan_id)?;
        conn.execute(
            r#"
            UPDATE scan_history
            SET completed_at = ?2, status = ?3, notes_scanned = ?4, notes_added = ?5,
                notes_updated = ?6, notes_deleted = ?7, duration_seconds = ?8
            WHERE id = ?1
            "#,
            params![
                scan_id,
                to_timestamp(&Utc::now()),
                ScanStatus::Completed.as_str(),
                counts.notes_scanned as i64,
                counts.notes_added as i64,
                counts.notes_updated as i64,
                counts.notes_deleted as i64,
                duration,
            ],
        )?;
        fetch_scan(&conn, scan_id)
    }

    /// Close a scan record as `failed`, keeping the counts reached so far.
    pub fn record_scan_fail(
        &self,
        scan_id: i64,
        message: &str,
        counts: ScanCounts,
    ) -> Result<ScanRecord> {
        let conn = self.conn.lock();
        let duration = elapsed_seconds(&conn, scan_id)?;
        conn.execute(
            r#"
            UPDATE scan_history
            SET completed_at = ?2, status = ?3, error_message = ?4, notes_scanned = ?5,
                notes_added = ?6, notes_updated = ?7, duration_seconds = ?8
            WHERE id = ?1
            "#,
            params![
                scan_id,
                to_timestamp(&Utc::now()),
                ScanStatus::Failed.as_str(),
                message,
                counts.notes_scanned as i64,
                counts.notes_added as i64,
                counts.notes_updated as i64,
                duration,
            ],
        )?;
        warn!("Scan {} failed: {}", scan_id, message);
        fetch_scan(&conn, scan_id)
    }

    /// Get one scan record.
    pub fn get_scan(&self, scan_id: i64) -> Result<Option<ScanRecord>> {
        let conn = self.conn.lock();
        match fetch_scan(&conn, scan_id) {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Scan records of a vault, newest first.
    pub fn scan_history(&self, vault_id: &VaultId, limit: Option<usize>) -> Result<Vec<ScanRecord>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM scan_history WHERE vault_id = ?1 ORDER BY id DESC LIMIT ?2",
            SCAN_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![vault_id.as_str(), sql_limit(limit)])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(row_to_scan(row)?);
        }
        Ok(records)
    }
}

fn elapsed_seconds(conn: &Connection, scan_id: i64) -> Result<f64> {
    let started: String = conn
        .query_row(
            "SELECT started_at FROM scan_history WHERE id = ?1",
            params![scan_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("scan {}", scan_id)))?;

    let elapsed = Utc::now() - parse_timestamp(&started)?;
    Ok(elapsed.num_microseconds().unwrap_or(0) as f64 / 1_000_000.0)
}

fn fetch_scan(conn: &Connection, scan_id: i64) -> Result<ScanRecord> {
    let sql = format!("SELECT {} FROM scan_history WHERE id = ?1", SCAN_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![scan_id])?;
    match rows.next()? {
        Some(row) => row_to_scan(row),
        None => Err(StoreError::NotFound(format!("scan {}", scan_id))),
    }
}

fn row_to_scan(row: &Row) -> Result<ScanRecord> {
    let started_at: String = row.get(2)?;
    let status: String = row.get(4)?;
    Ok(ScanRecord {
        id: row.get(0)?,
        vault_id: VaultId::from(row.get::<_, String>(1)?),
        started_at: parse_timestamp(&started_at)?,
        completed_at: parse_optional_timestamp(row.get(3)?)?,
        status: ScanStatus::parse(&status)
            .ok_or_else(|| StoreError::InvalidData(format!("unknown scan status {:?}", status)))?,
        notes_scanned: to_count(row.get(5)?),
        notes_added: to_count(row.get(6)?),
        notes_updated: to_count(row.get(7)?),
        notes_deleted: to_count(row.get(8)?),
        duration_seconds: row.get(9)?,
        error_message: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_scan_lifecycle() {
        let store = ContentStore::open_in_memory().unwrap();
        let vault = store.upsert_vault(Path::new("/v"), None).unwrap().id;

        let first = store.record_scan_start(&vault).unwrap();
        let running = store.get_scan(first).unwrap().unwrap();
        assert_eq!(running.status, ScanStatus::Running);
        assert!(running.completed_at.is_none());

        let counts = ScanCounts {
            notes_scanned: 3,
            notes_added: 2,
            notes_updated: 1,
            notes_deleted: 0,
        };
        let done = store.record_scan_complete(first, counts).unwrap();
        assert_eq!(done.status, ScanStatus::Completed);
        assert_eq!(done.notes_added, 2);
        assert!(done.duration_seconds.unwrap() >= 0.0);

        let second = store.record_scan_start(&vault).unwrap();
        let failed = store
            .record_scan_fail(second, "vault disappeared", ScanCounts::default())
            .unwrap();
        assert_eq!(failed.status, ScanStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("vault disappeared"));

        let history = store.scan_history(&vault, None).unwrap();
        assert_eq!(history.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(store.scan_history(&vault, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_scan() {
        let store = ContentStore::open_in_memory().unwrap();
        assert!(store.get_scan(42).unwrap().is_none());
        assert!(store.record_scan_complete(42, ScanCounts::default()).is_err());
    }
}
