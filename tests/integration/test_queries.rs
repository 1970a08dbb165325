//! Queries over loaded generations: inference, lemma search, hierarchy
//! bounds, cross references, paths and profiles.

use lexicon_bridge::query::LogicOp;
use lexicon_bridge::{
    CanonicalStore, Entity, EntityKey, HierarchyEdge, LinkKind, LoadGeneration, QueryEngine,
    QueryError, ResourceKind, StoreError,
};
use tempfile::TempDir;

use crate::fixtures::{
    class_xml, create_give_corpus, create_knowledge_base, semnet_json, write,
};

fn create_walk_corpus() -> TempDir {
    let root = TempDir::new().unwrap();
    let verbnet = root.path().join("verbnet");
    write(&verbnet, "run-51.3.2.xml", &class_xml("run-51.3.2", &["run", "walk"]));
    write(&verbnet, "give-13.1.xml", &class_xml("give-13.1", &["give"]));
    write(
        &root.path().join("semnet"),
        "verb-semnet.json",
        &semnet_json(&["run", "walk", "stroll"]),
    );
    root
}

#[tokio::test]
async fn test_singleton_overlap_infers_one_link() {
    let root = TempDir::new().unwrap();
    write(
        &root.path().join("verbnet"),
        "run-51.3.2.xml",
        &class_xml("run-51.3.2", &["run"]),
    );
    write(
        &root.path().join("semnet"),
        "verb-semnet.json",
        &semnet_json(&["run"]),
    );

    let kb = create_knowledge_base();
    kb.load_from_root(root.path()).await.unwrap();
    let generation = kb.current().unwrap();

    assert_eq!(generation.xref.explicit_count(), 0);
    assert_eq!(generation.xref.inferred_count(), 1);
    let link = &generation.xref.links()[0];
    assert_eq!(link.kind, LinkKind::InferredBySharedMember);
    assert_eq!(link.confidence, 1.0);
    assert_eq!(
        link.source,
        EntityKey::new(ResourceKind::ClassHierarchy, "run-51.3.2")
    );
    assert_eq!(
        link.target,
        EntityKey::new(ResourceKind::SemanticNetwork, "verb:run")
    );
}

#[tokio::test]
async fn test_lemma_search_and_or() {
    let corpus = create_walk_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();
    let engine = kb.engine();
    let resources = ["ClassHierarchy", "SemanticNetwork"];

    let both = engine
        .search_lemmas(&generation, &["run", "walk"], &resources, LogicOp::And)
        .unwrap();
    let keys: Vec<String> = both.entity_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["ClassHierarchy:run-51.3.2"]);
    assert!(!both.matches.contains_key(&ResourceKind::SemanticNetwork));

    let either = engine
        .search_lemmas(&generation, &["run", "walk"], &resources, LogicOp::Or)
        .unwrap();
    assert_eq!(either.entity_keys().len(), 3);
    let semnet = &either.matches[&ResourceKind::SemanticNetwork];
    assert_eq!(semnet["run"][0].key.id, "verb:run");
    assert_eq!(semnet["walk"][0].key.id, "verb:walk");
    assert!(either.matches[&ResourceKind::ClassHierarchy].contains_key("walk"));
}

#[tokio::test]
async fn test_lemma_search_is_case_insensitive() {
    let corpus = create_walk_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();

    let result = kb
        .engine()
        .search_lemmas(&generation, &["  GIVE "], &["ClassHierarchy"], LogicOp::Or)
        .unwrap();
    assert_eq!(result.entity_keys().len(), 1);
}

#[tokio::test]
async fn test_invalid_arguments() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();
    let engine = kb.engine();

    assert_eq!(
        engine
            .search_lemmas(&generation, &["give"], &["VerbNetz"], LogicOp::Or)
            .unwrap_err(),
        QueryError::InvalidResource("VerbNetz".to_string())
    );
    assert_eq!(
        engine
            .cross_reference(&generation, "ClassHierarchy", "give-13.1", "PredicateBank", Some(1.5))
            .unwrap_err(),
        QueryError::InvalidConfidence(1.5)
    );
    assert!(matches!(
        engine.search_by_pattern(&generation, "colour", "red", &["ClassHierarchy"]),
        Err(QueryError::InvalidPatternType(_))
    ));
    assert!(engine
        .hierarchy(&generation, "ClassHierarchy", "no-such-class", None)
        .unwrap()
        .is_none());
    assert!(engine
        .cross_reference(&generation, "ClassHierarchy", "no-such-class", "PredicateBank", None)
        .unwrap()
        .is_empty());
}

#[test]
fn test_hierarchy_is_bounded_on_cycles() {
    let mut store = CanonicalStore::new();
    store.put(
        ["a", "b", "c"]
            .iter()
            .map(|id| Entity::new(ResourceKind::ClassHierarchy, *id, *id).with_members(["x"]))
            .collect(),
        vec![
            HierarchyEdge::new(ResourceKind::ClassHierarchy, "a", "b"),
            HierarchyEdge::new(ResourceKind::ClassHierarchy, "b", "c"),
            HierarchyEdge::new(ResourceKind::ClassHierarchy, "c", "a"),
        ],
    );
    assert!(matches!(
        store.top_level_ancestor(ResourceKind::ClassHierarchy, "b"),
        Err(StoreError::CycleDetected { .. })
    ));

    let generation = LoadGeneration::from_store_default(store);
    let tree = QueryEngine::default()
        .hierarchy(&generation, "ClassHierarchy", "a", Some(50))
        .unwrap()
        .unwrap();
    assert_eq!(tree.ids(), vec!["a", "b", "c"]);

    let validation = generation.validation.as_ref().unwrap();
    let classes = validation.resource(ResourceKind::ClassHierarchy).unwrap();
    assert_eq!(
        classes.hierarchy_cycles,
        vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]]
    );
}

#[tokio::test]
async fn test_cross_reference_both_directions() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();
    let engine = kb.engine();

    let from_roleset = engine
        .cross_reference(&generation, "PredicateBank", "give.01", "ClassHierarchy", None)
        .unwrap();
    assert_eq!(from_roleset.len(), 1);
    assert!(from_roleset[0].is_explicit());
    assert_eq!(from_roleset[0].confidence, 1.0);
    assert_eq!(from_roleset[0].target.id, "give-13.1");

    let from_class = engine
        .cross_reference(&generation, "ClassHierarchy", "give-13.1", "PredicateBank", None)
        .unwrap();
    assert!(!from_class.is_empty());
    assert!(from_class[0].is_explicit());
    assert_eq!(from_class[0].source.id, "give-13.1");
    assert_eq!(from_class[0].target.id, "give.01");
    assert!(from_class
        .iter()
        .all(|l| l.target.kind == ResourceKind::PredicateBank));
    assert!(from_class
        .windows(2)
        .all(|w| w[0].confidence >= w[1].confidence));
}

#[tokio::test]
async fn test_unresolved_reference_is_kept() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();

    let links = generation
        .xref
        .links_from(ResourceKind::PredicateBank, "give.02");
    let unresolved: Vec<_> = links.iter().filter(|l| l.unresolved).collect();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].target.id, "99.9");
    assert_eq!(unresolved[0].confidence, 1.0);

    let validation = kb.validate().unwrap();
    let bank = validation.resource(ResourceKind::PredicateBank).unwrap();
    assert!(bank.unresolved_references.iter().any(|u| u.key == "99.9"));
}

#[tokio::test]
async fn test_pattern_and_attribute_search() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();
    let engine = kb.engine();

    let agents = engine
        .search_by_pattern(&generation, "role", "Agent", &["ClassHierarchy"])
        .unwrap();
    let ids: Vec<_> = agents[&ResourceKind::ClassHierarchy]
        .iter()
        .map(|s| s.key.id.as_str())
        .collect();
    assert_eq!(ids, vec!["give-13.1"]);

    let exact = engine
        .search_by_attribute(&generation, "role", "agent", false)
        .unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].score, 100);

    let fuzzy = engine
        .search_by_attribute(&generation, "role", "cip", true)
        .unwrap();
    assert_eq!(fuzzy[0].entry.name, "Recipient");
    assert_eq!(fuzzy[0].score, 75);
}

#[tokio::test]
async fn test_trace_path_through_shared_class() {
    let corpus = create_give_corpus();
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();

    let from = EntityKey::new(ResourceKind::PredicateBank, "give");
    let to = EntityKey::new(ResourceKind::PredicateBank, "give.01");
    let path = kb
        .engine()
        .trace_path(&generation, &from, &to, Some(4))
        .unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path.nodes.first(), Some(&from));
    assert_eq!(path.nodes.last(), Some(&to));
    assert_eq!(
        path.nodes[1],
        EntityKey::new(ResourceKind::ClassHierarchy, "give-13.1")
    );

    assert!(kb
        .engine()
        .trace_path(&generation, &from, &to, Some(1))
        .is_none());
}

#[tokio::test]
async fn test_semantic_profile_uses_exceptions() {
    let corpus = create_give_corpus();
    write(&corpus.path().join("wordnet"), "verb.exc", "gave give\n");
    let kb = create_knowledge_base();
    kb.load_from_root(corpus.path()).await.unwrap();
    let generation = kb.current().unwrap();
    let engine = kb.engine();

    assert_eq!(engine.base_forms(&generation, "Gave"), vec!["give"]);
    assert_eq!(engine.base_forms(&generation, "feed"), vec!["feed"]);

    let profile = engine.semantic_profile(&generation, "gave");
    assert_eq!(profile.base_forms, vec!["give"]);
    assert!(profile.entities[&ResourceKind::ClassHierarchy]
        .iter()
        .any(|s| s.key.id == "give-13.1"));
    assert!(profile.entities.contains_key(&ResourceKind::PredicateBank));
    assert!(profile.cross_references.iter().any(|l| l.is_explicit()));
}
