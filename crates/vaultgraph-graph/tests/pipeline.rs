//! Resolution and metrics against a populated store.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use vaultgraph_core::{NoteId, ReferenceTarget, VaultId};
use vaultgraph_graph::{GraphEngine, ReferenceResolver};
use vaultgraph_parser::{DocumentParser, FileTimes};
use vaultgraph_store::ContentStore;

fn vault_with(notes: &[(&str, &str)]) -> (Arc<ContentStore>, VaultId) {
    let store = Arc::new(ContentStore::open_in_memory().unwrap());
    let vault = store.upsert_vault(Path::new("/vaults/kb"), None).unwrap().id;
    let parser = DocumentParser::new();
    for (path, content) in notes {
        store
            .write_note(&vault, &parser.parse(path, content, FileTimes::now()))
            .unwrap();
    }
    (store, vault)
}

fn note_id(vault: &VaultId, path: &str) -> NoteId {
    NoteId::for_path(vault, path)
}

#[test]
fn test_resolution_marks_internal_and_broken() {
    let (store, vault) = vault_with(&[
        ("A.md", "[[B]] [[Missing]] [[notes/C.md#Part]]"),
        ("B.md", "---\ntitle: Bee\n---\n[[A|back]]"),
        ("notes/C.md", "[[../B]] [[Bee]]"),
    ]);

    let stats = ReferenceResolver::new(store.clone(), "md")
        .resolve_all(&vault)
        .unwrap();
    assert_eq!(stats.total_references, 6);
    assert_eq!(stats.resolved, 5);
    assert_eq!(stats.broken, 1);

    let from_a = store.get_references_from(&note_id(&vault, "A.md")).unwrap();
    assert_eq!(
        from_a[0].target,
        ReferenceTarget::Internal(note_id(&vault, "B.md"))
    );
    assert_eq!(from_a[1].target, ReferenceTarget::Broken);
    assert_eq!(
        from_a[2].target,
        ReferenceTarget::Internal(note_id(&vault, "notes/C.md"))
    );

    let broken = store.broken_references(&vault, None).unwrap();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].target_text, "Missing");
}

#[test]
fn test_resolution_is_a_full_recomputation() {
    let (store, vault) = vault_with(&[("A.md", "[[B]]")]);
    let resolver = ReferenceResolver::new(store.clone(), "md");
    assert_eq!(resolver.resolve_all(&vault).unwrap().broken, 1);

    store
        .write_note(
            &vault,
            &DocumentParser::new().parse("B.md", "", FileTimes::now()),
        )
        .unwrap();
    let stats = resolver.resolve_all(&vault).unwrap();
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.broken, 0);
}

#[test]
fn test_metrics_persisted_for_every_note() {
    let (store, vault) = vault_with(&[
        ("A.md", "[[B]]"),
        ("B.md", "[[C]]"),
        ("C.md", "[[A]] [[C]]"),
        ("D.md", "[[Nowhere]]"),
    ]);
    ReferenceResolver::new(store.clone(), "md")
        .resolve_all(&vault)
        .unwrap();

    let engine = GraphEngine::new(store.clone());
    let summary = engine.compute_metrics(&vault).unwrap();
    assert_eq!(summary.notes, 4);
    assert_eq!(summary.edges, 4);
    assert!((summary.density - 4.0 / 12.0).abs() < 1e-12);

    let metrics = store.get_vault_metrics(&vault).unwrap();
    assert_eq!(metrics.len(), 4);
    let total: f64 = metrics.iter().map(|m| m.pagerank).sum();
    assert!((total - 1.0).abs() < 1e-6);

    let c = store.get_metrics(&note_id(&vault, "C.md")).unwrap().unwrap();
    assert_eq!(c.in_degree, 2);
    assert_eq!(c.out_degree, 2);

    let d = store.get_metrics(&note_id(&vault, "D.md")).unwrap().unwrap();
    assert_eq!(d.total_degree(), 0);
    assert_eq!(d.betweenness, 0.0);
}

#[test]
fn test_clusters_and_neighborhoods() {
    let (store, vault) = vault_with(&[
        ("A.md", "[[B]]"),
        ("B.md", "[[C]]"),
        ("C.md", "[[A]]"),
        ("D.md", "[[E]]"),
        ("E.md", ""),
        ("F.md", ""),
    ]);
    ReferenceResolver::new(store.clone(), "md")
        .resolve_all(&vault)
        .unwrap();
    let engine = GraphEngine::new(store);

    let clusters = engine.find_clusters(&vault, 3).unwrap();
    let expected: BTreeSet<NoteId> = ["A.md", "B.md", "C.md"]
        .iter()
        .map(|p| note_id(&vault, p))
        .collect();
    assert_eq!(clusters, vec![expected]);
    assert!(clusters.iter().all(|c| c.len() >= 3));
    assert_eq!(engine.find_clusters(&vault, 1).unwrap().len(), 3);

    let around_a = engine.neighborhood(&note_id(&vault, "A.md"), 1).unwrap();
    assert_eq!(around_a.node_count(), 3);

    let lonely = engine.neighborhood(&note_id(&vault, "F.md"), 2).unwrap();
    assert_eq!(lonely.node_count(), 1);
    assert!(lonely.is_isolated_node(&note_id(&vault, "F.md")));
}
