//! Note upsert, lookup and tag association operations.

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;
use vaultgraph_core::{
    Metadata, Note, NoteId, ParsedNote, TagCount, UpsertOutcome, VaultId, content_hash,
};

use super::reference_ops::replace_references;
use super::{ContentStore, parse_timestamp, sql_limit, to_count, to_timestamp};
use crate::error::{Result, StoreError};

/// Outcome of an atomic per-note write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteWrite {
    pub note_id: NoteId,
    pub outcome: UpsertOutcome,
    pub references: usize,
    pub tags: usize,
}

const NOTE_COLUMNS: &str = "id, vault_id, path, title, content_hash, word_count, char_count, \
                            created_at, modified_at, metadata";

impl ContentStore {
    /// Insert or refresh a note, reporting how it compared to the stored row.
    ///
    /// Unchanged notes are still rewritten so timestamps and metadata stay
    /// current. A zero-valued metrics row is created alongside new notes.
    pub fn upsert_note(&self, vault_id: &VaultId, parsed: &ParsedNote) -> Result<(NoteId, UpsertOutcome)> {
        let conn = self.conn.lock();
        upsert_note(&conn, vault_id, parsed)
    }

    /// Replace the tag set of a note.
    pub fn upsert_tag_associations(&self, note_id: &NoteId, tags: &BTreeSet<String>) -> Result<usize> {
        self.with_transaction(|conn| replace_tags(conn, note_id, tags))
    }

    /// Write a parsed note, its references and its tags in one transaction.
    pub fn write_note(&self, vault_id: &VaultId, parsed: &ParsedNote) -> Result<NoteWrite> {
        self.with_transaction(|conn| {
            let (note_id, outcome) = upsert_note(conn, vault_id, parsed)?;
            let references = replace_references(conn, &note_id, &parsed.references)?;
            let tags = replace_tags(conn, &note_id, &parsed.tags)?;
            Ok(NoteWrite {
                note_id,
                outcome,
                references,
                tags,
            })
        })
    }

    /// Get a note by ID.
    pub fn get_note(&self, id: &NoteId) -> Result<Option<Note>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id.as_str()])?;

        match rows.next()? {
            Some(row) => Ok(Some(row_to_note(row)?)),
            None => Ok(None),
        }
    }

    /// Get a note by its vault-relative path.
    pub fn get_note_by_path(&self, vault_id: &VaultId, path: &str) -> Result<Option<Note>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM notes WHERE vault_id = ?1 AND path = ?2",
            NOTE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![vault_id.as_str(), path])?;

        match rows.next()? {
            Some(row) => Ok(Some(row_to_note(row)?)),
            None => Ok(None),
        }
    }

    /// List notes of a vault ordered by path.
    ///
    /// Omitting `limit` returns every row from `offset` onward.
    pub fn get_notes_by_vault(
        &self,
        vault_id: &VaultId,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Note>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM notes WHERE vault_id = ?1 ORDER BY path LIMIT ?2 OFFSET ?3",
            NOTE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![
            vault_id.as_str(),
            sql_limit(limit),
            offset.unwrap_or(0) as i64
        ])?;

        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(row_to_note(row)?);
        }
        Ok(notes)
    }

    /// Tags attached to a note, sorted.
    pub fn get_note_tags(&self, note_id: &NoteId) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT t.name FROM tags t
            JOIN note_tags nt ON nt.tag_id = t.id
            WHERE nt.note_id = ?1
            ORDER BY t.name
            "#,
        )?;
        let tags = stmt
            .query_map(params![note_id.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Tag usage within a vault, most used first.
    pub fn vault_tag_stats(&self, vault_id: &VaultId, limit: Option<usize>) -> Result<Vec<TagCount>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT t.name, COUNT(nt.note_id) AS note_count
            FROM tags t
            JOIN note_tags nt ON nt.tag_id = t.id
            JOIN notes n ON n.id = nt.note_id
            WHERE n.vault_id = ?1
            GROUP BY t.id
            ORDER BY note_count DESC, t.name
            LIMIT ?2
            "#,
        )?;
        let stats = stmt
            .query_map(params![vault_id.as_str(), sql_limit(limit)], |row| {
                Ok(TagCount {
                    tag: row.get(0)?,
                    note_count: to_count(row.get(1)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stats)
    }
}

pub(crate) fn upsert_note(
    conn: &Connection,
    vault_id: &VaultId,
    parsed: &ParsedNote,
) -> Result<(NoteId, UpsertOutcome)> {
    let note_id = NoteId::for_path(vault_id, &parsed.path);
    let hash = content_hash(&parsed.content);

    let previous: Option<String> = conn
        .query_row(
            "SELECT content_hash FROM notes WHERE id = ?1",
            params![note_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    let outcome = match previous {
        None => UpsertOutcome::Added,
        Some(ref stored) if *stored == hash => UpsertOutcome::Unchanged,
        Some(_) => UpsertOutcome::Updated,
    };

    let metadata = serde_json::to_string(&parsed.front_matter)?;

    conn.execute(
        r#"
        INSERT INTO notes (id, vault_id, path, title, content_hash, word_count, char_count,
                           created_at, modified_at, metadata)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            content_hash = excluded.content_hash,
            word_count = excluded.word_count,
            char_count = excluded.char_count,
            created_at = excluded.created_at,
            modified_at = excluded.modified_at,
            metadata = excluded.metadata
        "#,
        params![
            note_id.as_str(),
            vault_id.as_str(),
            parsed.path,
            parsed.title,
            hash,
            parsed.word_count as i64,
            parsed.char_count as i64,
            to_timestamp(&parsed.created_at),
            to_timestamp(&parsed.modified_at),
            metadata,
        ],
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO graph_metrics (note_id) VALUES (?1)",
        params![note_id.as_str()],
    )?;

    debug!("Upserted note {} ({:?})", parsed.path, outcome);
    Ok((note_id, outcome))
}

pub(crate) fn replace_tags(conn: &Connection, note_id: &NoteId, tags: &BTreeSet<String>) -> Result<usize> {
    conn.execute(
        "DELETE FROM note_tags WHERE note_id = ?1",
        params![note_id.as_str()],
    )?;

    let mut insert_tag = conn.prepare_cached("INSERT OR IGNORE INTO tags (name) VALUES (?1)")?;
    let mut associate = conn.prepare_cached(
        "INSERT OR IGNORE INTO note_tags (note_id, tag_id) SELECT ?1, id FROM tags WHERE name = ?2",
    )?;

    for tag in tags {
        insert_tag.execute(params![tag])?;
        associate.execute(params![note_id.as_str(), tag])?;
    }

    Ok(tags.len())
}

fn row_to_note(row: &Row) -> Result<Note> {
    let created_at: String = row.get(7)?;
    let modified_at: String = row.get(8)?;
    let metadata_json: String = row.get(9)?;

    let metadata = match serde_json::from_str::<serde_json::Value>(&metadata_json)? {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => Metadata::new(),
        other => {
            return Err(StoreError::InvalidData(format!(
                "note metadata is not an object: {}",
                other
            )));
        }
    };

    Ok(Note {
        id: NoteId::from(row.get::<_, String>(0)?),
        vault_id: VaultId::from(row.get::<_, String>(1)?),
        path: row.get(2)?,
        title: row.get(3)?,
        content_hash: row.get(4)?,
        word_count: to_count(row.get(5)?),
        char_count: to_count(row.get(6)?),
        created_at: parse_timestamp(&created_at)?,
        modified_at: parse_timestamp(&modified_at)?,
        metadata,
    })
}
