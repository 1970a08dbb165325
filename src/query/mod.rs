//! Query layer: lemma, pattern and attribute search, hierarchy navigation,
//! cross-reference lookup and semantic profiles.

mod engine;
pub mod types;

pub use engine::QueryEngine;
pub use types::{
    AttributeMatch, EntitySummary, HierarchyNode, LemmaSearchResult, LogicOp, MatchField,
    SemanticPath, SemanticProfile,
};
