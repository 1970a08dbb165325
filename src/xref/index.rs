use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use super::types::{CrossReference, LinkKind};
use crate::collections::ReferenceCollection;
use crate::config::XrefConfig;
use crate::model::{EntityKey, ResourceKind, EXPLICIT_REF_KEYS};
use crate::store::CanonicalStore;

/// All cross references of a load generation plus lookup indices.
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceIndex {
    links: Vec<CrossReference>,
    outgoing: HashMap<EntityKey, Vec<usize>>,
    incoming: HashMap<EntityKey, Vec<usize>>,
    pairs: HashMap<(ResourceKind, ResourceKind), Vec<usize>>,
}

impl CrossReferenceIndex {
    /// Build the index over a frozen store.
    ///
    /// Explicit links come from the reference keys in each entity's extra
    /// map. Inferred links join entities of different kinds sharing at least
    /// `min_shared_members` lowercased member lexemes, once per unordered
    /// pair, unless an explicit link already connects them.
    pub fn build(
        store: &CanonicalStore,
        collection: &ReferenceCollection,
        config: &XrefConfig,
    ) -> Self {
        let mut links = explicit_links(store);
        let explicit_count = links.len();

        if config.infer_links {
            let connected: HashSet<(EntityKey, EntityKey)> = links
                .iter()
                .filter(|l| !l.unresolved)
                .flat_map(|l| {
                    [
                        (l.source.clone(), l.target.clone()),
                        (l.target.clone(), l.source.clone()),
                    ]
                })
                .collect();
            links.extend(inferred_links(store, &connected, config.min_shared_members.max(1)));
        }

        let index = Self::from_links(links);
        info!(
            explicit = explicit_count,
            inferred = index.links.len() - explicit_count,
            unresolved = index.unresolved_count(),
            vocabularies = collection.sizes().values().filter(|n| **n > 0).count(),
            "Built cross-reference index"
        );
        index
    }

    /// Index an existing set of links, ordering each source's links for display.
    pub fn from_links(mut links: Vec<CrossReference>) -> Self {
        links.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| CrossReference::display_order(a, b))
        });

        let mut index = Self::default();
        for (i, link) in links.iter().enumerate() {
            index.outgoing.entry(link.source.clone()).or_default().push(i);
            if !link.unresolved {
                index.incoming.entry(link.target.clone()).or_default().push(i);
            }
            index
                .pairs
                .entry((link.source.kind, link.target.kind))
                .or_default()
                .push(i);
        }
        index.links = links;
        index
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn links(&self) -> &[CrossReference] {
        &self.links
    }

    /// Links whose source is `(kind, id)`, in display order.
    pub fn links_from(&self, kind: ResourceKind, id: &str) -> Vec<&CrossReference> {
        self.lookup(&self.outgoing, kind, id)
    }

    /// Resolved links whose target is `(kind, id)`.
    pub fn links_to(&self, kind: ResourceKind, id: &str) -> Vec<&CrossReference> {
        self.lookup(&self.incoming, kind, id)
    }

    /// Links from any entity of `source_kind` to any entity of `target_kind`.
    pub fn links_between(
        &self,
        source_kind: ResourceKind,
        target_kind: ResourceKind,
    ) -> Vec<&CrossReference> {
        self.pairs
            .get(&(source_kind, target_kind))
            .map(|ids| ids.iter().map(|&i| &self.links[i]).collect())
            .unwrap_or_default()
    }

    fn lookup(
        &self,
        map: &HashMap<EntityKey, Vec<usize>>,
        kind: ResourceKind,
        id: &str,
    ) -> Vec<&CrossReference> {
        map.get(&EntityKey::new(kind, id))
            .map(|ids| ids.iter().map(|&i| &self.links[i]).collect())
            .unwrap_or_default()
    }

    /// Unresolved links originating in `kind`.
    pub fn unresolved_from(&self, kind: ResourceKind) -> impl Iterator<Item = &CrossReference> {
        self.links
            .iter()
            .filter(move |l| l.unresolved && l.source.kind == kind)
    }

    // ========================================================================
    // Counts
    // ========================================================================

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn explicit_count(&self) -> usize {
        self.count_kind(LinkKind::Explicit)
    }

    pub fn inferred_count(&self) -> usize {
        self.count_kind(LinkKind::InferredBySharedMember)
    }

    pub fn unresolved_count(&self) -> usize {
        self.links.iter().filter(|l| l.unresolved).count()
    }

    fn count_kind(&self, kind: LinkKind) -> usize {
        self.links.iter().filter(|l| l.kind == kind).count()
    }

    /// Link count per `Source->Target` resource pair.
    pub fn pair_counts(&self) -> BTreeMap<String, usize> {
        self.pairs
            .iter()
            .map(|((s, t), ids)| (format!("{s}->{t}"), ids.len()))
            .collect()
    }

    /// Outgoing link count per source kind.
    pub fn counts_by_kind(&self) -> BTreeMap<ResourceKind, usize> {
        let mut counts = BTreeMap::new();
        for link in &self.links {
            *counts.entry(link.source.kind).or_insert(0) += 1;
        }
        counts
    }
}

fn explicit_links(store: &CanonicalStore) -> Vec<CrossReference> {
    let mut links = Vec::new();
    let mut seen: HashSet<(EntityKey, EntityKey, &'static str)> = HashSet::new();

    for entity in store.iter() {
        let source = entity.key();
        for &(field, target_kind) in EXPLICIT_REF_KEYS {
            for raw in entity.references(field) {
                let (target, unresolved) = match store.resolve_alias(target_kind, raw) {
                    Some(id) => (EntityKey::new(target_kind, id), false),
                    None => (EntityKey::new(target_kind, raw), true),
                };
                if unresolved {
                    debug!(source = %source, key = raw, via = field, "Unresolved reference");
                }
                if seen.insert((source.clone(), target.clone(), field)) {
                    links.push(CrossReference::explicit(
                        source.clone(),
                        target,
                        field,
                        unresolved,
                    ));
                }
            }
        }
    }
    links
}

fn inferred_links(
    store: &CanonicalStore,
    connected: &HashSet<(EntityKey, EntityKey)>,
    min_shared: usize,
) -> Vec<CrossReference> {
    let members: Vec<(EntityKey, Vec<String>)> = store
        .iter()
        .map(|e| (e.key(), e.normalized_members()))
        .filter(|(_, m)| !m.is_empty())
        .collect();

    let mut postings: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, (_, lexemes)) in members.iter().enumerate() {
        for lexeme in lexemes {
            postings.entry(lexeme.as_str()).or_default().push(i);
        }
    }

    let mut links = Vec::new();
    for (key, lexemes) in &members {
        // candidates with a larger key, so each unordered pair is seen once
        let mut shared: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for lexeme in lexemes {
            for &j in &postings[lexeme.as_str()] {
                let other = &members[j].0;
                if other.kind != key.kind && other > key {
                    shared.entry(j).or_default().push(lexeme.clone());
                }
            }
        }

        for (j, common) in shared {
            if common.len() < min_shared {
                continue;
            }
            let (other, other_lexemes) = &members[j];
            if connected.contains(&(key.clone(), other.clone())) {
                continue;
            }
            let union = lexemes.len() + other_lexemes.len() - common.len();
            let confidence = common.len() as f64 / union as f64;
            links.push(CrossReference::inferred(
                key.clone(),
                other.clone(),
                common,
                confidence,
            ));
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, FRAMENET_FRAMES, VERBNET_CLASSES};

    fn create_test_store() -> CanonicalStore {
        let class = Entity::new(ResourceKind::ClassHierarchy, "give-13.1", "give-13.1")
            .with_alias("13.1")
            .with_members(["give", "lend", "pass"]);
        let mut roleset = Entity::new(ResourceKind::PredicateBank, "give.01", "transfer")
            .with_members(["give"]);
        roleset.push_reference(VERBNET_CLASSES, "13.1");
        roleset.push_reference(FRAMENET_FRAMES, "Giving");
        let frame = Entity::new(ResourceKind::FrameInventory, "Giving", "Giving")
            .with_members(["give", "hand"]);
        let category = Entity::new(ResourceKind::CategoryMapping, "Transfer", "Transfer")
            .with_members(["Give", "lend"]);

        let mut store = CanonicalStore::new();
        store.put(vec![class, roleset, frame, category], vec![]);
        store
    }

    fn build(store: &CanonicalStore) -> CrossReferenceIndex {
        CrossReferenceIndex::build(store, &ReferenceCollection::default(), &XrefConfig::default())
    }

    #[test]
    fn test_explicit_links_resolve_aliases() {
        let index = build(&create_test_store());
        let links = index.links_from(ResourceKind::PredicateBank, "give.01");
        let explicit: Vec<_> = links.iter().filter(|l| l.is_explicit()).collect();
        assert_eq!(explicit.len(), 2);
        let vn = explicit
            .iter()
            .find(|l| l.via == VERBNET_CLASSES)
            .unwrap();
        assert_eq!(vn.target, EntityKey::new(ResourceKind::ClassHierarchy, "give-13.1"));
        assert_eq!(vn.confidence, 1.0);
        assert!(!vn.unresolved);
    }

    #[test]
    fn test_unresolved_kept_with_raw_key() {
        let mut store = create_test_store();
        let mut entity = Entity::new(ResourceKind::SenseInventory, "give-v.1", "give");
        entity.push_reference(FRAMENET_FRAMES, "Nonexistent_frame");
        store.put(vec![entity], vec![]);

        let index = build(&store);
        let links = index.links_from(ResourceKind::SenseInventory, "give-v.1");
        assert_eq!(links.len(), 1);
        assert!(links[0].unresolved);
        assert_eq!(links[0].target.id, "Nonexistent_frame");
        assert_eq!(index.unresolved_count(), 1);
        assert!(index
            .links_to(ResourceKind::FrameInventory, "Nonexistent_frame")
            .is_empty());
    }

    #[test]
    fn test_inferred_skips_explicitly_linked_pairs() {
        let index = build(&create_test_store());
        let between = index.links_between(ResourceKind::ClassHierarchy, ResourceKind::PredicateBank);
        assert!(between.iter().all(|l| l.is_explicit()));
        assert!(index
            .links_between(ResourceKind::PredicateBank, ResourceKind::ClassHierarchy)
            .iter()
            .all(|l| l.is_explicit()));
    }

    #[test]
    fn test_inferred_jaccard_and_direction() {
        let index = build(&create_test_store());
        // ClassHierarchy < CategoryMapping, so the class is the source
        let links = index.links_between(ResourceKind::ClassHierarchy, ResourceKind::CategoryMapping);
        assert_eq!(links.len(), 1);
        let link = links[0];
        assert_eq!(link.kind, LinkKind::InferredBySharedMember);
        assert_eq!(link.shared_members, vec!["give", "lend"]);
        assert!((link.confidence - 2.0 / 3.0).abs() < 1e-9);
        assert!(index
            .links_between(ResourceKind::CategoryMapping, ResourceKind::ClassHierarchy)
            .is_empty());
        assert_eq!(
            index.links_to(ResourceKind::CategoryMapping, "Transfer").len(),
            1
        );
    }

    #[test]
    fn test_ordering_explicit_first() {
        let index = build(&create_test_store());
        let links = index.links_from(ResourceKind::ClassHierarchy, "give-13.1");
        let inferred: Vec<_> = links.iter().map(|l| l.kind).collect();
        assert!(inferred.iter().all(|k| *k == LinkKind::InferredBySharedMember));
        let confidences: Vec<_> = links.iter().map(|l| l.confidence).collect();
        let mut sorted = confidences.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        assert_eq!(confidences, sorted);
    }

    #[test]
    fn test_min_shared_members() {
        let store = create_test_store();
        let config = XrefConfig {
            min_shared_members: 2,
            ..Default::default()
        };
        let index = CrossReferenceIndex::build(&store, &ReferenceCollection::default(), &config);
        assert!(index
            .links()
            .iter()
            .filter(|l| !l.is_explicit())
            .all(|l| l.shared_members.len() >= 2));
        assert_eq!(index.inferred_count(), 1);
    }

    #[test]
    fn test_inference_disabled() {
        let config = XrefConfig {
            infer_links: false,
            ..Default::default()
        };
        let index = CrossReferenceIndex::build(
            &create_test_store(),
            &ReferenceCollection::default(),
            &config,
        );
        assert_eq!(index.inferred_count(), 0);
        assert_eq!(index.explicit_count(), 2);
    }

    #[test]
    fn test_build_is_idempotent() {
        let store = create_test_store();
        assert_eq!(build(&store).links(), build(&store).links());
    }

    #[test]
    fn test_pair_counts() {
        let index = build(&create_test_store());
        let counts = index.pair_counts();
        assert_eq!(counts["PredicateBank->ClassHierarchy"], 1);
        assert_eq!(counts["PredicateBank->FrameInventory"], 1);
    }
}
