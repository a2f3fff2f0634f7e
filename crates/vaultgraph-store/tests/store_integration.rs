//! Store behaviour across vault lifecycles.

use std::collections::BTreeSet;
use std::path::Path;

use vaultgraph_core::{ParsedNote, RawReference, Reference, ReferenceTarget, VaultId};
use vaultgraph_parser::{DocumentParser, FileTimes};
use vaultgraph_store::ContentStore;

fn parsed(path: &str, content: &str) -> ParsedNote {
    DocumentParser::new().parse(path, content, FileTimes::now())
}

fn populate(store: &ContentStore, root: &str) -> VaultId {
    let vault = store.upsert_vault(Path::new(root), None).unwrap().id;
    store
        .write_note(&vault, &parsed("A.md", "#alpha [[B]] [[Missing]]"))
        .unwrap();
    store.write_note(&vault, &parsed("B.md", "#alpha #beta")).unwrap();
    vault
}

#[test]
fn test_rewrite_is_idempotent() {
    let store = ContentStore::open_in_memory().unwrap();
    let vault = populate(&store, "/vaults/one");
    let before = store.vault_counts(&vault).unwrap();
    let ids_before: Vec<_> = store
        .get_notes_by_vault(&vault, None, None)
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();

    populate(&store, "/vaults/one");

    let after = store.vault_counts(&vault).unwrap();
    let ids_after: Vec<_> = store
        .get_notes_by_vault(&vault, None, None)
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(before, after);
    assert_eq!(ids_before, ids_after);
    assert_eq!(after.notes, 2);
    assert_eq!(after.references, 2);
    assert_eq!(after.unique_tags, 2);
    assert_eq!(after.tag_associations, 3);
}

#[test]
fn test_delete_vault_cascades() {
    let store = ContentStore::open_in_memory().unwrap();
    let keep = populate(&store, "/vaults/keep");
    let drop = populate(&store, "/vaults/drop");
    store.record_scan_start(&drop).unwrap();

    assert!(store.delete_vault(&drop).unwrap());

    let stats = store.stats().unwrap();
    assert_eq!(stats.vaults, 1);
    assert_eq!(stats.notes, 2);
    assert_eq!(stats.references, 2);
    assert_eq!(stats.scans, 0);
    assert!(store.get_vault(&drop).unwrap().is_none());
    assert_eq!(store.vault_counts(&keep).unwrap().notes, 2);
}

#[test]
fn test_degrees_follow_resolved_references() {
    let store = ContentStore::open_in_memory().unwrap();
    let vault = populate(&store, "/vaults/deg");
    let a = store.get_note_by_path(&vault, "A.md").unwrap().unwrap();
    let b = store.get_note_by_path(&vault, "B.md").unwrap().unwrap();

    // pending references are not edges yet
    assert!(
        store
            .note_degrees(&vault)
            .unwrap()
            .iter()
            .all(|d| d.is_orphan())
    );

    let refs = store.get_references_from(&a.id).unwrap();
    store
        .update_reference_targets(&[
            (refs[0].id.clone(), ReferenceTarget::Internal(b.id.clone())),
            (refs[1].id.clone(), ReferenceTarget::Broken),
        ])
        .unwrap();

    let degrees = store.note_degrees(&vault).unwrap();
    assert_eq!(degrees[0].path, "A.md");
    assert_eq!((degrees[0].in_degree, degrees[0].out_degree), (0, 1));
    assert_eq!((degrees[1].in_degree, degrees[1].out_degree), (1, 0));

    let counts = store.vault_counts(&vault).unwrap();
    assert_eq!(counts.resolved_references, 1);
    assert_eq!(counts.broken_references, 1);
}

#[test]
fn test_tag_associations_replace_previous_set() {
    let store = ContentStore::open_in_memory().unwrap();
    let vault = populate(&store, "/vaults/tags");
    let a = store.get_note_by_path(&vault, "A.md").unwrap().unwrap();
    assert_eq!(store.get_note_tags(&a.id).unwrap(), vec!["alpha"]);

    let tags: BTreeSet<String> = ["gamma", "delta"].iter().map(|t| t.to_string()).collect();
    assert_eq!(store.upsert_tag_associations(&a.id, &tags).unwrap(), 2);
    assert_eq!(store.get_note_tags(&a.id).unwrap(), vec!["delta", "gamma"]);

    // B still carries alpha
    let stats: Vec<(String, usize)> = store
        .vault_tag_stats(&vault, None)
        .unwrap()
        .into_iter()
        .map(|t| (t.tag, t.note_count))
        .collect();
    assert!(stats.contains(&("alpha".to_string(), 1)));
    assert!(stats.contains(&("gamma".to_string(), 1)));

    assert_eq!(store.upsert_tag_associations(&a.id, &BTreeSet::new()).unwrap(), 0);
    assert!(store.get_note_tags(&a.id).unwrap().is_empty());
}

#[test]
fn test_replace_references_resets_resolution() {
    let store = ContentStore::open_in_memory().unwrap();
    let vault = populate(&store, "/vaults/refs");
    let a = store.get_note_by_path(&vault, "A.md").unwrap().unwrap();
    let b = store.get_note_by_path(&vault, "B.md").unwrap().unwrap();

    let first = store.get_references_from(&a.id).unwrap();
    store
        .update_reference_targets(&[(first[0].id.clone(), ReferenceTarget::Internal(b.id.clone()))])
        .unwrap();
    assert_eq!(store.get_references_to(&b.id).unwrap().len(), 1);

    let fresh = vec![
        RawReference {
            target: "B".into(),
            display: Some("bee".into()),
        },
        RawReference {
            target: "C".into(),
            display: None,
        },
        RawReference {
            target: "B".into(),
            display: None,
        },
    ];
    assert_eq!(store.replace_references_for_note(&a.id, &fresh).unwrap(), 3);

    let refs = store.get_references_from(&a.id).unwrap();
    let targets: Vec<&str> = refs.iter().map(|r| r.target_text.as_str()).collect();
    assert_eq!(targets, vec!["B", "C", "B"]);
    assert_eq!(refs[0].display_text.as_deref(), Some("bee"));
    assert!(refs.iter().all(|r| r.target == ReferenceTarget::Pending));
    assert_eq!(refs[1].id, Reference::id_for(&a.id, 1));
    assert!(store.get_references_to(&b.id).unwrap().is_empty());

    assert_eq!(store.replace_references_for_note(&a.id, &[]).unwrap(), 0);
    assert!(store.get_references_from(&a.id).unwrap().is_empty());
}
