//! Graph metric persistence and live degree queries.

use rusqlite::{Connection, Row, params};
use tracing::debug;
use vaultgraph_core::{GraphMetrics, NoteDegree, NoteId, VaultId};

use super::{ContentStore, parse_optional_timestamp, to_count, to_timestamp};
use crate::error::Result;

const METRIC_COLUMNS: &str = "note_id, pagerank, in_degree, out_degree, betweenness, closeness, \
                              clustering_coefficient, computed_at";

impl ContentStore {
    /// Overwrite the metrics row of one note.
    pub fn upsert_metrics(&self, metrics: &GraphMetrics) -> Result<()> {
        let conn = self.conn.lock();
        write_metrics(&conn, metrics)
    }

    /// Overwrite metrics rows in one transaction.
    pub fn replace_metrics(&self, metrics: &[GraphMetrics]) -> Result<usize> {
        self.with_transaction(|conn| {
            for row in metrics {
                write_metrics(conn, row)?;
            }
            debug!("Stored metrics for {} notes", metrics.len());
            Ok(metrics.len())
        })
    }

    /// Last computed metrics of a note.
    pub fn get_metrics(&self, note_id: &NoteId) -> Result<Option<GraphMetrics>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM graph_metrics WHERE note_id = ?1", METRIC_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![note_id.as_str()])?;

        match rows.next()? {
            Some(row) => Ok(Some(row_to_metrics(row)?)),
            None => Ok(None),
        }
    }

    /// Stored metrics for every note of a vault, highest pagerank first.
    pub fn get_vault_metrics(&self, vault_id: &VaultId) -> Result<Vec<GraphMetrics>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT m.note_id, m.pagerank, m.in_degree, m.out_degree, m.betweenness,
                   m.closeness, m.clustering_coefficient, m.computed_at
            FROM graph_metrics m
            JOIN notes n ON n.id = m.note_id
            WHERE n.vault_id = ?1
            ORDER BY m.pagerank DESC, n.path
            "#,
        )?;
        let mut rows = stmt.query(params![vault_id.as_str()])?;

        let mut metrics = Vec::new();
        while let Some(row) = rows.next()? {
            metrics.push(row_to_metrics(row)?);
        }
        Ok(metrics)
    }

    /// Live in/out degree of every note, counted from resolved references.
    ///
    /// Multiple links to the same target and self-links each count once per
    /// occurrence, matching the edge set of the knowledge graph.
    pub fn note_degrees(&self, vault_id: &VaultId) -> Result<Vec<NoteDegree>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT n.id, n.path, n.title,
                (SELECT COUNT(*) FROM note_references r
                  WHERE r.target_note_id = n.id AND r.kind = 'internal') AS in_degree,
                (SELECT COUNT(*) FROM note_references r
                  WHERE r.source_note_id = n.id AND r.kind = 'internal'
                    AND r.target_note_id IS NOT NULL) AS out_degree
            FROM notes n
            WHERE n.vault_id = ?1
            ORDER BY n.path
            "#,
        )?;
        let degrees = stmt
            .query_map(params![vault_id.as_str()], |row| {
                Ok(NoteDegree {
                    note_id: NoteId::from(row.get::<_, String>(0)?),
                    path: row.get(1)?,
                    title: row.get(2)?,
                    in_degree: to_count(row.get(3)?),
                    out_degree: to_count(row.get(4)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(degrees)
    }
}

fn write_metrics(conn: &Connection, metrics: &GraphMetrics) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR REPLACE INTO graph_metrics
            (note_id, pagerank, in_degree, out_degree, betweenness, closeness,
             clustering_coefficient, computed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            metrics.note_id.as_str(),
            metrics.pagerank,
            metrics.in_degree as i64,
            metrics.out_degree as i64,
            metrics.betweenness,
            metrics.closeness,
            metrics.clustering_coefficient,
            metrics.computed_at.as_ref().map(to_timestamp),
        ],
    )?;
    Ok(())
}

fn row_to_metrics(row: &Row) -> Result<GraphMetrics> {
    Ok(GraphMetrics {
        note_id: NoteId::from(row.get::<_, String>(0)?),
        pagerank: row.get(1)?,
        in_degree: to_count(row.get(2)?),
        out_degree: to_count(row.get(3)?),
        betweenness: row.get(4)?,
        closeness: row.get(5)?,
        clustering_coefficient: row.get(6)?,
        computed_at: parse_optional_timestamp(row.get(7)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::Path;
    use vaultgraph_parser::{DocumentParser, FileTimes};

    #[test]
    fn test_metrics_overwrite_wholesale() {
        let store = ContentStore::open_in_memory().unwrap();
        let vault = store.upsert_vault(Path::new("/v"), None).unwrap().id;
        let note = DocumentParser::new().parse("A.md", "", FileTimes::now());
        let (id, _) = store.upsert_note(&vault, &note).unwrap();

        let computed = GraphMetrics {
            pagerank: 0.5,
            in_degree: 2,
            out_degree: 1,
            betweenness: 0.25,
            closeness: 0.75,
            clustering_coefficient: 1.0,
            computed_at: Some(Utc::now()),
            ..GraphMetrics::zeroed(id.clone())
        };
        store.replace_metrics(std::slice::from_ref(&computed)).unwrap();
        assert_eq!(store.get_metrics(&id).unwrap().unwrap(), computed);

        store.upsert_metrics(&GraphMetrics::zeroed(id.clone())).unwrap();
        let reset = store.get_metrics(&id).unwrap().unwrap();
        assert_eq!(reset, GraphMetrics::zeroed(id.clone()));

        assert_eq!(store.get_vault_metrics(&vault).unwrap().len(), 1);
    }

    #[test]
    fn test_rewriting_note_keeps_metrics_row() {
        let store = ContentStore::open_in_memory().unwrap();
        let vault = store.upsert_vault(Path::new("/v"), None).unwrap().id;
        let parser = DocumentParser::new();

        let (id, _) = store
            .upsert_note(&vault, &parser.parse("A.md", "v1", FileTimes::now()))
            .unwrap();
        let computed = GraphMetrics {
            pagerank: 1.0,
            ..GraphMetrics::zeroed(id.clone())
        };
        store.upsert_metrics(&computed).unwrap();

        store
            .upsert_note(&vault, &parser.parse("A.md", "v2", FileTimes::now()))
            .unwrap();
        assert_eq!(store.get_metrics(&id).unwrap().unwrap().pagerank, 1.0);
    }
}
