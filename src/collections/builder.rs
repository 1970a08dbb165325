use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::QueryError;
use crate::model::{EntityKey, PatternCategory, ResourceKind};
use crate::store::CanonicalStore;

/// One deduplicated vocabulary item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCollectionEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    /// Number of entities declaring this item.
    pub usage_count: usize,
    /// Entity that declared the item first.
    pub first_seen: EntityKey,
}

/// A later entity supplied a definition that disagrees with the kept one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionWarning {
    pub category: PatternCategory,
    pub name: String,
    pub kept: String,
    pub conflicting: String,
    pub entity: EntityKey,
}

/// Vocabulary per pattern category, entries in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCollection {
    collections: BTreeMap<PatternCategory, Vec<ReferenceCollectionEntry>>,
    warnings: Vec<CollectionWarning>,
}

impl ReferenceCollection {
    /// Build every collection from the store.
    ///
    /// Kinds are walked in declaration order and entities in insertion
    /// order, so the result depends only on the store contents. Names merge
    /// exactly (case-sensitive). The first non-empty definition is kept.
    pub fn build(store: &CanonicalStore) -> Self {
        let mut collections: BTreeMap<PatternCategory, Vec<ReferenceCollectionEntry>> =
            BTreeMap::new();
        let mut positions: HashMap<(PatternCategory, String), usize> = HashMap::new();
        let mut warnings = Vec::new();

        for kind in ResourceKind::ALL {
            for entity in store.entities(kind) {
                let key = entity.key();
                // an entity counts once per item even if it repeats the annotation
                let mut counted: Vec<(PatternCategory, &str)> = Vec::new();

                for annotation in &entity.annotations {
                    let entries = collections.entry(annotation.category).or_default();
                    let slot = (annotation.category, annotation.name.clone());
                    let pos = *positions.entry(slot).or_insert_with(|| {
                        entries.push(ReferenceCollectionEntry {
                            name: annotation.name.clone(),
                            definition: None,
                            usage_count: 0,
                            first_seen: key.clone(),
                        });
                        entries.len() - 1
                    });
                    let entry = &mut entries[pos];

                    let marker = (annotation.category, annotation.name.as_str());
                    if !counted.contains(&marker) {
                        entry.usage_count += 1;
                        counted.push(marker);
                    }

                    match (&entry.definition, &annotation.definition) {
                        (None, Some(def)) => entry.definition = Some(def.clone()),
                        (Some(kept), Some(def)) if kept != def => {
                            debug!(
                                category = %annotation.category,
                                name = %annotation.name,
                                entity = %key,
                                "Conflicting definition ignored"
                            );
                            warnings.push(CollectionWarning {
                                category: annotation.category,
                                name: annotation.name.clone(),
                                kept: kept.clone(),
                                conflicting: def.clone(),
                                entity: key.clone(),
                            });
                        }
                        _ => {}
                    }
                }
            }
        }

        let collection = Self {
            collections,
            warnings,
        };
        info!(
            roles = collection.len(PatternCategory::Role),
            predicates = collection.len(PatternCategory::Predicate),
            conflicts = collection.warnings.len(),
            "Built reference collections"
        );
        collection
    }

    /// Entries of one category in first-seen order.
    pub fn entries(&self, category: PatternCategory) -> &[ReferenceCollectionEntry] {
        self.collections
            .get(&category)
            .map(|e| e.as_slice())
            .unwrap_or(&[])
    }

    /// Entries of the collection named `name` (`roles`, `selrestr`, ...).
    pub fn collection(&self, name: &str) -> Result<&[ReferenceCollectionEntry], QueryError> {
        let category: PatternCategory = name.parse()?;
        Ok(self.entries(category))
    }

    pub fn get(&self, category: PatternCategory, name: &str) -> Option<&ReferenceCollectionEntry> {
        self.entries(category).iter().find(|e| e.name == name)
    }

    pub fn len(&self, category: PatternCategory) -> usize {
        self.entries(category).len()
    }

    /// Entry count per category name, for statistics.
    pub fn sizes(&self) -> BTreeMap<String, usize> {
        PatternCategory::ALL
            .into_iter()
            .map(|c| (c.as_str().to_string(), self.len(c)))
            .collect()
    }

    pub fn warnings(&self) -> &[CollectionWarning] {
        &self.warnings
    }
}
