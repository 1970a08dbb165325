//! Snapshot export and import, and determinism of derived structures.

use lexicon_bridge::config::XrefConfig;
use lexicon_bridge::export::Snapshot;
use lexicon_bridge::{
    export_snapshot, import_json_snapshot, CrossReferenceIndex, ExportFormat, LoadGeneration,
    ReferenceCollection, ResourceKind,
};

use crate::fixtures::{create_give_corpus, create_knowledge_base};

#[tokio::test]
async fn test_json_round_trip_preserves_entities_and_links() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();

    let all: [&str; 0] = [];
    let bytes = export_snapshot(&generation, &all, ExportFormat::Json).unwrap();
    let snapshot = import_json_snapshot(&bytes).unwrap();

    assert_eq!(snapshot.metadata.generation, generation.id);
    assert_eq!(snapshot.entity_count(), generation.store.total_len());
    let original_links = snapshot.resolved_links();
    assert!(!original_links.is_empty());

    let rebuilt = LoadGeneration::from_store_default(snapshot.into_store());
    assert_eq!(rebuilt.store.total_len(), generation.store.total_len());
    assert_eq!(
        rebuilt.store.edge_count(ResourceKind::ClassHierarchy),
        generation.store.edge_count(ResourceKind::ClassHierarchy)
    );
    let recaptured = Snapshot::capture(&rebuilt, &ResourceKind::ALL);
    assert_eq!(recaptured.resolved_links(), original_links);
}

#[tokio::test]
async fn test_export_subset_and_formats() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();

    let bytes = export_snapshot(&generation, &["PredicateBank"], ExportFormat::Json).unwrap();
    let snapshot = import_json_snapshot(&bytes).unwrap();
    assert_eq!(snapshot.metadata.resources, vec![ResourceKind::PredicateBank]);
    assert_eq!(snapshot.entity_count(), 3);
    assert!(snapshot
        .cross_references
        .iter()
        .all(|l| l.source.kind == ResourceKind::PredicateBank));

    let xml = export_snapshot(&generation, &["ClassHierarchy"], ExportFormat::Xml).unwrap();
    let xml = String::from_utf8(xml).unwrap();
    assert!(xml.contains("give-13.1-1"));

    let csv = export_snapshot(&generation, &["ClassHierarchy"], "csv".parse().unwrap()).unwrap();
    let csv = String::from_utf8(csv).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.lines().next().unwrap().starts_with("kind,id,name"));
}

#[tokio::test]
async fn test_rejects_bad_snapshots() {
    assert!(import_json_snapshot(b"{not json").is_err());
    assert!("yaml".parse::<ExportFormat>().is_err());
}

#[tokio::test]
async fn test_index_build_is_idempotent() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();

    let config = XrefConfig::default();
    let collection = ReferenceCollection::build(&generation.store);
    assert_eq!(collection, generation.collection);

    let first = CrossReferenceIndex::build(&generation.store, &collection, &config);
    let second = CrossReferenceIndex::build(&generation.store, &collection, &config);
    assert_eq!(first.links(), second.links());
    assert_eq!(first.links(), generation.xref.links());
    assert_eq!(first.pair_counts(), second.pair_counts());
}
