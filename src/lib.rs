//! Lexicon Bridge: a unified, cross-referenced knowledge base over
//! heterogeneous lexical resources.
//!
//! Verb class hierarchies, frame inventories, predicate banks, sense
//! inventories, synset networks and auxiliary mapping tables are parsed
//! into one canonical model, linked to each other, validated and exposed
//! for search and navigation.

pub mod adapters;
pub mod collections;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod generation;
pub mod model;
pub mod query;
pub mod sources;
pub mod store;
pub mod validation;
pub mod xref;

pub use adapters::{AdapterOutput, AdapterRegistry, FormatAdapter, ParseTask, TaskOutput};
pub use collections::{ReferenceCollection, ReferenceCollectionEntry};
pub use config::{init_logging, Config};
pub use coordinator::{CancelToken, KnowledgeBase, KnowledgeBaseBuilder, LoadProgress};
pub use error::{
    ConfigError, ExportError, LexiconError, ParseError, QueryError, Result, StoreError,
};
pub use export::{export_snapshot, import_json_snapshot, ExportFormat, Snapshot};
pub use generation::{
    GenerationId, LoadGeneration, LoadReport, LoadStatus, ResourceLoadStatus, Statistics,
};
pub use model::{Entity, EntityKey, HierarchyEdge, PatternCategory, ResourceKind};
pub use query::{LogicOp, QueryEngine};
pub use store::CanonicalStore;
pub use validation::ValidationReport;
pub use xref::{CrossReference, CrossReferenceIndex, LinkKind};
