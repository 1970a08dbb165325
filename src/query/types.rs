//! Result types for knowledge base queries.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::collections::ReferenceCollectionEntry;
use crate::error::QueryError;
use crate::model::{Entity, EntityKey, ResourceKind};
use crate::xref::CrossReference;

// ============================================================================
// Lemma Search
// ============================================================================

/// How multiple lemmas combine in a lemma search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicOp {
    /// An entity must match every lemma.
    And,
    /// An entity must match at least one lemma.
    #[default]
    Or,
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicOp::And => f.write_str("and"),
            LogicOp::Or => f.write_str("or"),
        }
    }
}

impl FromStr for LogicOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "and" => Ok(LogicOp::And),
            "or" => Ok(LogicOp::Or),
            other => Err(format!("unknown logic operator '{other}'")),
        }
    }
}

/// Compact view of an entity for query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub key: EntityKey,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default)]
    pub member_lexemes: Vec<String>,
}

impl From<&Entity> for EntitySummary {
    fn from(entity: &Entity) -> Self {
        Self {
            key: entity.key(),
            name: entity.name.clone(),
            definition: entity.definition.clone(),
            pos: entity.pos.clone(),
            member_lexemes: entity.member_lexemes.clone(),
        }
    }
}

/// Lemma search matches grouped by resource, then by (normalized) lemma.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LemmaSearchResult {
    pub lemmas: Vec<String>,
    pub logic: LogicOp,
    pub matches: BTreeMap<ResourceKind, BTreeMap<String, Vec<EntitySummary>>>,
}

impl LemmaSearchResult {
    /// Distinct entities matched across all lemmas.
    pub fn entity_keys(&self) -> Vec<&EntityKey> {
        let mut keys: Vec<&EntityKey> = self
            .matches
            .values()
            .flat_map(|by_lemma| by_lemma.values().flatten())
            .map(|s| &s.key)
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

// ============================================================================
// Attribute Search
// ============================================================================

/// Which field of a collection entry matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Name,
    Definition,
}

/// A ranked vocabulary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMatch {
    pub entry: ReferenceCollectionEntry,
    /// 100 exact name, 90 exact definition, 75 name substring, 60 definition substring.
    pub score: u8,
    pub matched_on: MatchField,
}

// ============================================================================
// Hierarchy
// ============================================================================

/// A node of a bounded hierarchy subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: String,
    pub name: String,
    pub depth: usize,
    pub children: Vec<HierarchyNode>,
    /// Children exist below the depth bound but were not expanded.
    #[serde(default)]
    pub truncated: bool,
}

impl HierarchyNode {
    /// Ids in depth-first order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = vec![self.id.as_str()];
        for child in &self.children {
            ids.extend(child.ids());
        }
        ids
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

// ============================================================================
// Profiles and Paths
// ============================================================================

/// Everything the knowledge base knows about one lemma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticProfile {
    pub lemma: String,
    /// Base forms the lemma was expanded to before matching.
    pub base_forms: Vec<String>,
    pub entities: BTreeMap<ResourceKind, Vec<EntitySummary>>,
    pub cross_references: Vec<CrossReference>,
}

/// Shortest chain of cross references between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticPath {
    /// Entities from start to end, inclusive.
    pub nodes: Vec<EntityKey>,
    /// Links oriented along the path; one fewer than `nodes`.
    pub links: Vec<CrossReference>,
}

impl SemanticPath {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Parse an optional resource filter; an empty list selects every kind.
pub(crate) fn parse_resources<S: AsRef<str>>(names: &[S]) -> Result<Vec<ResourceKind>, QueryError> {
    if names.is_empty() {
        return Ok(ResourceKind::ALL.to_vec());
    }
    let mut kinds = ResourceKind::parse_list(names)?;
    kinds.sort();
    kinds.dedup();
    Ok(kinds)
}
