//! Reference replacement, resolution updates and reference queries.

use rusqlite::{Connection, Row, params};
use tracing::debug;
use vaultgraph_core::{BrokenReference, NoteId, RawReference, Reference, ReferenceTarget, VaultId};

use super::{ContentStore, sql_limit, to_count};
use crate::error::Result;

const REFERENCE_COLUMNS: &str =
    "r.id, r.source_note_id, r.ordinal, r.target_text, r.display_text, r.kind, r.target_note_id";

impl ContentStore {
    /// Replace every outgoing reference of a note with fresh, unresolved ones.
    pub fn replace_references_for_note(
        &self,
        note_id: &NoteId,
        references: &[RawReference],
    ) -> Result<usize> {
        self.with_transaction(|conn| replace_references(conn, note_id, references))
    }

    /// Outgoing references of a note in document order.
    pub fn get_references_from(&self, note_id: &NoteId) -> Result<Vec<Reference>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM note_references r WHERE r.source_note_id = ?1 ORDER BY r.ordinal",
            REFERENCE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let refs = stmt
            .query_map(params![note_id.as_str()], row_to_reference)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(refs)
    }

    /// Resolved references pointing at a note.
    pub fn get_references_to(&self, note_id: &NoteId) -> Result<Vec<Reference>> {
        let conn = self.conn.lock();
        let sql = format!(
            r#"
            SELECT {} FROM note_references r
            JOIN notes n ON n.id = r.source_note_id
            WHERE r.target_note_id = ?1 AND r.kind = 'internal'
            ORDER BY n.path, r.ordinal
            "#,
            REFERENCE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let refs = stmt
            .query_map(params![note_id.as_str()], row_to_reference)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(refs)
    }

    /// Every reference whose source note lives in the vault.
    pub fn get_references_for_vault(&self, vault_id: &VaultId) -> Result<Vec<Reference>> {
        let conn = self.conn.lock();
        let sql = format!(
            r#"
            SELECT {} FROM note_references r
            JOIN notes n ON n.id = r.source_note_id
            WHERE n.vault_id = ?1
            ORDER BY n.path, r.ordinal
            "#,
            REFERENCE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let refs = stmt
            .query_map(params![vault_id.as_str()], row_to_reference)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(refs)
    }

    /// Apply resolution outcomes in one transaction.
    pub fn update_reference_targets(&self, updates: &[(String, ReferenceTarget)]) -> Result<usize> {
        self.with_transaction(|conn| {
            let mut stmt = conn.prepare_cached(
                "UPDATE note_references SET kind = ?2, target_note_id = ?3 WHERE id = ?1",
            )?;
            let mut updated = 0;
            for (reference_id, target) in updates {
                updated += stmt.execute(params![
                    reference_id,
                    target.kind(),
                    target.note_id().map(NoteId::as_str)
                ])?;
            }
            debug!("Updated {} reference targets", updated);
            Ok(updated)
        })
    }

    /// References marked broken, with their source notes.
    pub fn broken_references(
        &self,
        vault_id: &VaultId,
        limit: Option<usize>,
    ) -> Result<Vec<BrokenReference>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT r.id, n.id, n.path, n.title, r.target_text, r.display_text
            FROM note_references r
            JOIN notes n ON n.id = r.source_note_id
            WHERE n.vault_id = ?1 AND r.kind = 'broken'
            ORDER BY n.path, r.ordinal
            LIMIT ?2
            "#,
        )?;
        let broken = stmt
            .query_map(params![vault_id.as_str(), sql_limit(limit)], |row| {
                Ok(BrokenReference {
                    reference_id: row.get(0)?,
                    source_note_id: NoteId::from(row.get::<_, String>(1)?),
                    source_path: row.get(2)?,
                    source_title: row.get(3)?,
                    target_text: row.get(4)?,
                    display_text: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(broken)
    }
}

pub(crate) fn replace_references(
    conn: &Connection,
    note_id: &NoteId,
    references: &[RawReference],
) -> Result<usize> {
    conn.execute(
        "DELETE FROM note_references WHERE source_note_id = ?1",
        params![note_id.as_str()],
    )?;

    let mut insert = conn.prepare_cached(
        r#"
        INSERT INTO note_references
            (id, source_note_id, ordinal, target_text, display_text, target_note_id, kind)
        VALUES (?1, ?2, ?3, ?4, ?5, NULL, 'internal')
        "#,
    )?;

    for (ordinal, reference) in references.iter().enumerate() {
        insert.execute(params![
            Reference::id_for(note_id, ordinal),
            note_id.as_str(),
            ordinal as i64,
            reference.target,
            reference.display,
        ])?;
    }

    Ok(references.len())
}

fn row_to_reference(row: &Row) -> rusqlite::Result<Reference> {
    let kind: String = row.get(5)?;
    Ok(Reference {
        id: row.get(0)?,
        source_note_id: NoteId::from(row.get::<_, String>(1)?),
        ordinal: to_count(row.get(2)?),
        target_text: row.get(3)?,
        display_text: row.get(4)?,
        target: ReferenceTarget::from_parts(&kind, row.get(6)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use vaultgraph_core::ParsedNote;
    use vaultgraph_parser::{DocumentParser, FileTimes};

    fn setup() -> (ContentStore, VaultId) {
        let store = ContentStore::open_in_memory().unwrap();
        let vault = store.upsert_vault(Path::new("/vaults/refs"), None).unwrap();
        (store, vault.id)
    }

    fn parsed(path: &str, content: &str) -> ParsedNote {
        DocumentParser::new().parse(path, content, FileTimes::now())
    }

    #[test]
    fn test_references_start_pending_with_stable_ids() {
        let (store, vault) = setup();
        let write = store
            .write_note(&vault, &parsed("A.md", "[[B]] and [[C|see C]]"))
            .unwrap();

        let refs = store.get_references_from(&write.note_id).unwrap();
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.target == ReferenceTarget::Pending));
        assert_eq!(refs[1].display_text.as_deref(), Some("see C"));

        let again = store
            .write_note(&vault, &parsed("A.md", "[[B]] and [[C|see C]]"))
            .unwrap();
        let ids: Vec<_> = store
            .get_references_from(&again.note_id)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, refs.into_iter().map(|r| r.id).collect::<Vec<_>>());
    }

    #[test]
    fn test_update_targets_and_queries() {
        let (store, vault) = setup();
        let a = store.write_note(&vault, &parsed("A.md", "[[B]] [[Nowhere]]")).unwrap();
        let b = store.write_note(&vault, &parsed("B.md", "")).unwrap();

        let refs = store.get_references_from(&a.note_id).unwrap();
        let updated = store
            .update_reference_targets(&[
                (refs[0].id.clone(), ReferenceTarget::Internal(b.note_id.clone())),
                (refs[1].id.clone(), ReferenceTarget::Broken),
            ])
            .unwrap();
        assert_eq!(updated, 2);

        let incoming = store.get_references_to(&b.note_id).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source_note_id, a.note_id);

        let broken = store.broken_references(&vault, None).unwrap();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].target_text, "Nowhere");
        assert_eq!(broken[0].source_path, "A.md");

        let all = store.get_references_for_vault(&vault).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[1].is_broken());
        assert_eq!(all[1].target.note_id(), None);
    }

    #[test]
    fn test_rewrite_resets_resolution() {
        let (store, vault) = setup();
        let a = store.write_note(&vault, &parsed("A.md", "[[Gone]]")).unwrap();
        let refs = store.get_references_from(&a.note_id).unwrap();
        store
            .update_reference_targets(&[(refs[0].id.clone(), ReferenceTarget::Broken)])
            .unwrap();

        store.write_note(&vault, &parsed("A.md", "[[Gone]]")).unwrap();
        let refs = store.get_references_from(&a.note_id).unwrap();
        assert_eq!(refs[0].target, ReferenceTarget::Pending);
        assert!(store.broken_references(&vault, None).unwrap().is_empty());
    }
}
