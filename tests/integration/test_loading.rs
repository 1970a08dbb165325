//! Loading: discovery, per-resource status, parse failures, reload and
//! cancellation.

use std::collections::HashMap;
use std::sync::Arc;

use lexicon_bridge::{
    Config, KnowledgeBase, LexiconError, LoadStatus, QueryEngine, ResourceKind,
};
use tempfile::TempDir;

use crate::fixtures::{
    class_xml, create_give_corpus, create_knowledge_base, create_test_config, semnet_json,
    write,
};

#[tokio::test]
async fn test_class_hierarchy_navigation() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();

    let generation = kb.current().unwrap();
    let engine = kb.engine();
    let tree = engine
        .hierarchy(&generation, "ClassHierarchy", "give-13.1", Some(2))
        .unwrap()
        .unwrap();
    assert_eq!(tree.ids(), vec!["give-13.1", "give-13.1-1"]);
    assert_eq!(
        engine
            .parent(&generation, "ClassHierarchy", "give-13.1-1")
            .unwrap()
            .as_deref(),
        Some("give-13.1")
    );
    assert_eq!(
        engine
            .parent(&generation, "ClassHierarchy", "give-13.1")
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_missing_directory_is_not_found() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();

    let mut paths = HashMap::new();
    paths.insert(ResourceKind::ClassHierarchy, corpus.path().join("verbnet"));
    paths.insert(ResourceKind::FrameInventory, corpus.path().join("framenet"));
    let report = kb.load_all(paths).await.unwrap();

    let frames = &report.per_resource[&ResourceKind::FrameInventory];
    assert_eq!(frames.status, LoadStatus::NotFound);
    assert_eq!(frames.entity_count, 0);
    assert_eq!(
        report.status(ResourceKind::ClassHierarchy),
        Some(LoadStatus::Loaded)
    );

    let generation = kb.current().unwrap();
    assert!(generation.store.entities(ResourceKind::FrameInventory).is_empty());
    let found = kb
        .engine()
        .search_lemmas(&generation, &["feed"], &["ClassHierarchy"], Default::default())
        .unwrap();
    assert_eq!(found.entity_keys().len(), 1);
}

#[tokio::test]
async fn test_malformed_file_is_skipped() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("vn");
    for i in 0..9 {
        let id = format!("class{i}-{i}.1");
        let member = format!("verb{i}");
        write(&dir, &format!("{id}.xml"), &class_xml(&id, &[member.as_str()]));
    }
    write(&dir, "broken.xml", r#"<VNCLASS ID="broken-1"><MEMBERS>"#);

    let kb = create_knowledge_base();
    let report = kb.load_from_root(root.path()).await.unwrap();

    let classes = &report.per_resource[&ResourceKind::ClassHierarchy];
    assert_eq!(classes.stats.attempted, 10);
    assert_eq!(classes.stats.succeeded, 9);
    assert_eq!(classes.stats.failed, 1);
    assert_eq!(classes.stats.errors.len(), 1);
    assert!(classes.stats.errors[0].file.ends_with("broken.xml"));
    assert_eq!(classes.entity_count, 9);
    assert_eq!(report.failed_files(), 1);

    let generation = kb.current().unwrap();
    let found = kb
        .engine()
        .search_lemmas(&generation, &["verb4"], &["ClassHierarchy"], Default::default())
        .unwrap();
    assert_eq!(found.entity_keys().len(), 1);
}

#[tokio::test]
async fn test_entity_order_follows_file_order() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("verbnet");
    for id in ["c-3", "a-1", "b-2"] {
        write(&dir, &format!("{id}.xml"), &class_xml(id, &["x"]));
    }

    let kb = create_knowledge_base();
    kb.load_from_root(root.path()).await.unwrap();
    let generation = kb.current().unwrap();
    let ids: Vec<_> = generation
        .store
        .entities(ResourceKind::ClassHierarchy)
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(ids, vec!["a-1", "b-2", "c-3"]);
}

#[tokio::test]
async fn test_object_keyed_nodes_keep_in_file_order() {
    let root = TempDir::new().unwrap();
    write(
        &root.path().join("semnet"),
        "verb-semnet.json",
        &semnet_json(&["zebra", "apple", "mango"]),
    );

    let kb = create_knowledge_base();
    kb.load_from_root(root.path()).await.unwrap();
    let generation = kb.current().unwrap();
    let ids: Vec<_> = generation
        .store
        .entities(ResourceKind::SemanticNetwork)
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(ids, vec!["verb:zebra", "verb:apple", "verb:mango"]);
}

#[tokio::test]
async fn test_category_split_across_files_is_merged() {
    let root = TempDir::new().unwrap();
    let bso = root.path().join("BSO");
    write(
        &bso,
        "BSOVNMapping_withMembers.csv",
        "BSO_Category,VN_Class,Members\nTransfer,give-13.1,\"[give, lend]\"\n",
    );
    write(
        &bso,
        "VNBSOMapping_withMembers.csv",
        "VN_Class,BSO_Category,Members\ncontribute-13.2,Transfer,[donate]\n",
    );

    let kb = create_knowledge_base();
    let report = kb.load_from_root(root.path()).await.unwrap();
    let mapping = &report.per_resource[&ResourceKind::CategoryMapping];
    assert_eq!(mapping.status, LoadStatus::Loaded);
    assert_eq!(mapping.stats.succeeded, 2);
    assert_eq!(mapping.entity_count, 1);
    assert!(mapping.store_warnings.is_empty());

    let generation = kb.current().unwrap();
    let transfer = generation
        .store
        .get(ResourceKind::CategoryMapping, "Transfer")
        .unwrap();
    assert_eq!(transfer.member_lexemes, vec!["give", "lend", "donate"]);
    assert_eq!(
        transfer.references("verbnet_classes"),
        vec!["give-13.1", "contribute-13.2"]
    );

    let validation = kb.validate().unwrap();
    assert!(validation
        .resource(ResourceKind::CategoryMapping)
        .unwrap()
        .duplicate_entities
        .is_empty());
}

#[tokio::test]
async fn test_api_variant_directory_is_discovered() {
    let root = TempDir::new().unwrap();
    write(
        &root.path().join("verbnet_api"),
        "run-51.3.2.xml",
        &class_xml("run-51.3.2", &["run"]),
    );

    let kb = create_knowledge_base();
    let report = kb.load_from_root(root.path()).await.unwrap();
    assert_eq!(
        report.status(ResourceKind::ClassHierarchy),
        Some(LoadStatus::Loaded)
    );
}

#[tokio::test]
async fn test_readers_keep_their_generation_across_reload() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let held = kb.current().unwrap();

    write(
        &corpus.path().join("verbnet"),
        "run-51.3.2.xml",
        &class_xml("run-51.3.2", &["run"]),
    );
    kb.load_from_root(corpus.path()).await.unwrap();
    let fresh = kb.current().unwrap();

    assert!(!Arc::ptr_eq(&held, &fresh));
    assert_eq!(held.store.len(ResourceKind::ClassHierarchy), 2);
    assert_eq!(fresh.store.len(ResourceKind::ClassHierarchy), 3);
}

#[tokio::test]
async fn test_concurrent_queries_during_reload() {
    let corpus = create_give_corpus();
    let kb = Arc::new(create_knowledge_base());
    kb.load_from_root(corpus.path()).await.unwrap();

    let reader = {
        let kb = Arc::clone(&kb);
        tokio::spawn(async move {
            let engine = QueryEngine::default();
            for _ in 0..50 {
                let generation = kb.current().unwrap();
                let tree = engine
                    .hierarchy(&generation, "ClassHierarchy", "give-13.1", None)
                    .unwrap()
                    .unwrap();
                assert_eq!(tree.node_count(), 2);
                tokio::task::yield_now().await;
            }
        })
    };
    for _ in 0..3 {
        kb.load_from_root(corpus.path()).await.unwrap();
    }
    reader.await.unwrap();
}

#[tokio::test]
async fn test_cancel_then_reload() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();

    kb.cancel_token().cancel();
    let result = kb.load_from_root(corpus.path()).await;
    assert!(matches!(result, Err(LexiconError::Cancelled)));
    assert!(kb.current().is_none());

    let report = kb.load_from_root(corpus.path()).await.unwrap();
    assert_eq!(kb.current().unwrap().id, report.generation);
}

#[tokio::test]
async fn test_load_from_config_file() {
    let corpus = create_give_corpus();
    let toml = format!(
        r#"
[corpora]
root = "{}"

[load]
max_concurrent_files = 2
validate_after_load = false

[xref]
infer_links = false
"#,
        corpus.path().display()
    );
    let config = Config::from_str(&toml).unwrap();
    let kb = KnowledgeBase::new(config).unwrap();
    let report = kb.load_configured().await.unwrap();

    assert_eq!(report.loaded_kinds().len(), 2);
    let generation = kb.current().unwrap();
    assert!(generation.validation.is_none());
    assert_eq!(generation.xref.inferred_count(), 0);
    assert!(kb.validate().is_ok());
}

#[tokio::test]
async fn test_statistics_after_load() {
    let corpus = create_give_corpus();
    let mut config = create_test_config();
    config.xref.infer_links = false;
    let kb = KnowledgeBase::new(config).unwrap();
    kb.load_from_root(corpus.path()).await.unwrap();

    let stats = kb.statistics().unwrap();
    assert_eq!(stats.per_resource[&ResourceKind::ClassHierarchy].entities, 2);
    assert_eq!(stats.per_resource[&ResourceKind::PredicateBank].entities, 3);
    assert_eq!(stats.per_resource[&ResourceKind::PredicateBank].hierarchy_edges, 2);
    assert_eq!(
        stats.cross_references.per_pair["PredicateBank->ClassHierarchy"],
        2
    );
    assert!(stats.cross_references.unresolved >= 1);
    assert_eq!(stats.cross_references.inferred, 0);
}
