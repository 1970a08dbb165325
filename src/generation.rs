//! Immutable load generations and their reports.
//!
//! A [`LoadGeneration`] bundles everything one load produced. It is shared
//! as `Arc<LoadGeneration>` and never mutated; a reload builds a new one.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collections::ReferenceCollection;
use crate::config::XrefConfig;
use crate::model::{normalize_lemma, ParseStats, ResourceKind};
use crate::store::{CanonicalStore, StoreWarning};
use crate::validation::{validate, ValidationReport};
use crate::xref::CrossReferenceIndex;

/// Identifier of a load generation.
pub type GenerationId = Uuid;

// ============================================================================
// Load Report
// ============================================================================

/// Outcome of loading one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// At least one entity was loaded.
    Loaded,
    /// The configured path does not exist.
    NotFound,
    /// The path exists but yielded no entities.
    Empty,
}

/// Per-resource section of a [`LoadReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLoadStatus {
    pub status: LoadStatus,
    pub path: Option<PathBuf>,
    pub stats: ParseStats,
    pub entity_count: usize,
    pub duration_ms: u64,
    /// Duplicate keys and rejected parents recorded while storing this resource.
    #[serde(default)]
    pub store_warnings: Vec<StoreWarning>,
}

impl ResourceLoadStatus {
    pub fn not_found(path: Option<PathBuf>) -> Self {
        Self {
            status: LoadStatus::NotFound,
            path,
            stats: ParseStats::default(),
            entity_count: 0,
            duration_ms: 0,
            store_warnings: Vec::new(),
        }
    }
}

/// Summary of one load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub generation: GenerationId,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub per_resource: BTreeMap<ResourceKind, ResourceLoadStatus>,
}

impl LoadReport {
    pub fn new(generation: GenerationId, started_at: DateTime<Utc>) -> Self {
        Self {
            generation,
            started_at,
            duration_ms: 0,
            per_resource: BTreeMap::new(),
        }
    }

    pub fn status(&self, kind: ResourceKind) -> Option<LoadStatus> {
        self.per_resource.get(&kind).map(|r| r.status)
    }

    pub fn loaded_kinds(&self) -> Vec<ResourceKind> {
        self.per_resource
            .iter()
            .filter(|(_, r)| r.status == LoadStatus::Loaded)
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn total_entities(&self) -> usize {
        self.per_resource.values().map(|r| r.entity_count).sum()
    }

    pub fn failed_files(&self) -> usize {
        self.per_resource.values().map(|r| r.stats.failed).sum()
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatistics {
    pub entities: usize,
    pub hierarchy_edges: usize,
    pub relations: usize,
    pub outgoing_links: usize,
    pub unresolved_links: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossReferenceStatistics {
    pub total: usize,
    pub explicit: usize,
    pub inferred: usize,
    pub unresolved: usize,
    /// Keyed by `Source->Target`.
    pub per_pair: BTreeMap<String, usize>,
}

/// Consolidated counts for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub generation: GenerationId,
    pub created_at: DateTime<Utc>,
    pub total_entities: usize,
    pub per_resource: BTreeMap<ResourceKind, ResourceStatistics>,
    pub cross_references: CrossReferenceStatistics,
    /// Entry count per vocabulary.
    pub collections: BTreeMap<String, usize>,
    pub lemma_exceptions: usize,
}

// ============================================================================
// Load Generation
// ============================================================================

/// One complete, immutable load.
#[derive(Debug)]
pub struct LoadGeneration {
    pub id: GenerationId,
    pub created_at: DateTime<Utc>,
    pub store: CanonicalStore,
    pub collection: ReferenceCollection,
    pub xref: CrossReferenceIndex,
    pub report: LoadReport,
    pub validation: Option<ValidationReport>,
    /// Normalized inflected form to base forms.
    exceptions: HashMap<String, Vec<String>>,
}

impl LoadGeneration {
    /// Build collections, the cross-reference index and (optionally) the
    /// validation report over a filled store.
    pub fn from_store(
        store: CanonicalStore,
        exceptions: Vec<(String, String)>,
        report: LoadReport,
        xref_config: &XrefConfig,
        run_validation: bool,
    ) -> Self {
        let collection = ReferenceCollection::build(&store);
        let xref = CrossReferenceIndex::build(&store, &collection, xref_config);
        let validation = run_validation.then(|| validate(&store, &xref));

        let mut table: HashMap<String, Vec<String>> = HashMap::new();
        for (inflected, base) in exceptions {
            let bases = table.entry(normalize_lemma(&inflected)).or_default();
            let base = normalize_lemma(&base);
            if !base.is_empty() && !bases.contains(&base) {
                bases.push(base);
            }
        }

        Self {
            id: report.generation,
            created_at: Utc::now(),
            store,
            collection,
            xref,
            report,
            validation,
            exceptions: table,
        }
    }

    /// Generation over a store with default settings, for tools and tests.
    pub fn from_store_default(store: CanonicalStore) -> Self {
        let report = LoadReport::new(Uuid::new_v4(), Utc::now());
        Self::from_store(store, Vec::new(), report, &XrefConfig::default(), true)
    }

    /// Base forms recorded for an inflected form.
    pub fn exceptions_for(&self, word: &str) -> Option<&[String]> {
        self.exceptions
            .get(&normalize_lemma(word))
            .map(|b| b.as_slice())
    }

    pub fn exception_count(&self) -> usize {
        self.exceptions.len()
    }

    pub fn statistics(&self) -> Statistics {
        let link_counts = self.xref.counts_by_kind();
        let per_resource = self
            .store
            .kinds()
            .into_iter()
            .map(|kind| {
                let stats = ResourceStatistics {
                    entities: self.store.len(kind),
                    hierarchy_edges: self.store.edge_count(kind),
                    relations: self.store.relations(kind).len(),
                    outgoing_links: link_counts.get(&kind).copied().unwrap_or(0),
                    unresolved_links: self.xref.unresolved_from(kind).count(),
                };
                (kind, stats)
            })
            .collect();

        Statistics {
            generation: self.id,
            created_at: self.created_at,
            total_entities: self.store.total_len(),
            per_resource,
            cross_references: CrossReferenceStatistics {
                total: self.xref.len(),
                explicit: self.xref.explicit_count(),
                inferred: self.xref.inferred_count(),
                unresolved: self.xref.unresolved_count(),
                per_pair: self.xref.pair_counts(),
            },
            collections: self.collection.sizes(),
            lemma_exceptions: self.exceptions.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, HierarchyEdge, PatternCategory, VERBNET_CLASSES};

    fn create_test_generation() -> LoadGeneration {
        let mut class = Entity::new(ResourceKind::ClassHierarchy, "give-13.1", "give-13.1")
            .with_alias("13.1")
            .with_members(["give"]);
        class.annotate(PatternCategory::Role, "Agent", None);
        let sub = Entity::new(ResourceKind::ClassHierarchy, "give-13.1-1", "give-13.1-1")
            .with_members(["lend"]);
        let mut roleset = Entity::new(ResourceKind::PredicateBank, "give.01", "transfer");
        roleset.push_reference(VERBNET_CLASSES, "13.1");

        let mut store = CanonicalStore::new();
        store.put(
            vec![class, sub, roleset],
            vec![HierarchyEdge::new(
                ResourceKind::ClassHierarchy,
                "give-13.1",
                "give-13.1-1",
            )],
        );
        let report = LoadReport::new(Uuid::new_v4(), Utc::now());
        LoadGeneration::from_store(
            store,
            vec![
                ("gave".to_string(), "give".to_string()),
                ("Gave".to_string(), "give".to_string()),
                ("axes".to_string(), "ax".to_string()),
                ("axes".to_string(), "axis".to_string()),
            ],
            report,
            &XrefConfig::default(),
            true,
        )
    }

    #[test]
    fn test_generation_id_matches_report() {
        let generation = create_test_generation();
        assert_eq!(generation.id, generation.report.generation);
        assert!(generation.validation.is_some());
    }

    #[test]
    fn test_exceptions_table() {
        let generation = create_test_generation();
        assert_eq!(generation.exceptions_for("GAVE").unwrap(), &["give".to_string()]);
        assert_eq!(generation.exceptions_for("axes").unwrap().len(), 2);
        assert!(generation.exceptions_for("give").is_none());
        assert_eq!(generation.exception_count(), 2);
    }

    #[test]
    fn test_statistics() {
        let stats = create_test_generation().statistics();
        assert_eq!(stats.total_entities, 3);
        let classes = &stats.per_resource[&ResourceKind::ClassHierarchy];
        assert_eq!(classes.entities, 2);
        assert_eq!(classes.hierarchy_edges, 1);
        assert_eq!(stats.cross_references.explicit, 1);
        assert_eq!(stats.cross_references.per_pair["PredicateBank->ClassHierarchy"], 1);
        assert_eq!(stats.collections["role"], 1);
        assert_eq!(stats.lemma_exceptions, 2);
    }

    #[test]
    fn test_report_helpers() {
        let mut report = LoadReport::new(Uuid::new_v4(), Utc::now());
        report.per_resource.insert(
            ResourceKind::FrameInventory,
            ResourceLoadStatus::not_found(Some(PathBuf::from("/missing"))),
        );
        assert_eq!(
            report.status(ResourceKind::FrameInventory),
            Some(LoadStatus::NotFound)
        );
        assert!(report.loaded_kinds().is_empty());
        assert_eq!(report.status(ResourceKind::ClassHierarchy), None);
    }
}
