//! Adapter registry: one format adapter per resource kind.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::delimited::CategoryMappingAdapter;
use super::framenet::FrameInventoryAdapter;
use super::ontonotes::SenseInventoryAdapter;
use super::propbank::PredicateBankAdapter;
use super::reference::ReferenceDocAdapter;
use super::semnet::SemanticNetworkAdapter;
use super::traits::{AdapterOutput, FormatAdapter};
use super::verbnet::ClassHierarchyAdapter;
use super::wordnet::SynsetNetworkAdapter;
use crate::model::ResourceKind;

/// Built-in adapter for a resource kind.
pub fn default_adapter(kind: ResourceKind) -> Arc<dyn FormatAdapter> {
    match kind {
        ResourceKind::ClassHierarchy => Arc::new(ClassHierarchyAdapter::new()),
        ResourceKind::FrameInventory => Arc::new(FrameInventoryAdapter::new()),
        ResourceKind::PredicateBank => Arc::new(PredicateBankAdapter::new()),
        ResourceKind::SenseInventory => Arc::new(SenseInventoryAdapter::new()),
        ResourceKind::SynsetNetwork => Arc::new(SynsetNetworkAdapter::new()),
        ResourceKind::CategoryMapping => Arc::new(CategoryMappingAdapter::new()),
        ResourceKind::SemanticNetwork => Arc::new(SemanticNetworkAdapter::new()),
        ResourceKind::ReferenceDoc => Arc::new(ReferenceDocAdapter::new()),
    }
}

/// Registry for format adapters.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<ResourceKind, Arc<dyn FormatAdapter>>,
}

impl AdapterRegistry {
    /// Create a registry with the built-in adapter for every kind.
    pub fn new() -> Self {
        let adapters = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, default_adapter(kind)))
            .collect();
        Self { adapters }
    }

    /// Adapter registered for a kind.
    pub fn for_kind(&self, kind: ResourceKind) -> Arc<dyn FormatAdapter> {
        self.adapters
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| default_adapter(kind))
    }

    /// Replace the adapter for the kind it reports.
    pub fn register(&mut self, adapter: Arc<dyn FormatAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    /// Parse already-filtered files of one resource sequentially.
    pub fn parse(&self, kind: ResourceKind, files: &[PathBuf]) -> AdapterOutput {
        let adapter = self.for_kind(kind);
        debug!(adapter = adapter.name(), resource = %kind, files = files.len(), "Parsing resource");
        adapter.parse(files)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.adapters.iter().map(|(k, a)| (k, a.name())))
            .finish()
    }
}
