//! Core types for the canonical lexical data model.
//!
//! Every resource, whatever its source format, is normalized into
//! [`Entity`] records tagged with a [`ResourceKind`], plus
//! [`HierarchyEdge`]s for resources that nest entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

// ============================================================================
// Resource Kinds
// ============================================================================

/// The lexical resource an entity was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Hierarchical verb classes with members, roles and frames.
    ClassHierarchy,
    /// Semantic frames with frame elements and lexical units.
    FrameInventory,
    /// Predicate-argument rolesets.
    PredicateBank,
    /// Coarse sense groupings with mappings into other resources.
    SenseInventory,
    /// Synonym sets with pointer relations.
    SynsetNetwork,
    /// Category-to-class mapping tables.
    CategoryMapping,
    /// Verb and noun semantic networks.
    SemanticNetwork,
    /// Definition tables for predicates, roles, constants and features.
    ReferenceDoc,
}

impl ResourceKind {
    /// All kinds in declaration order.
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::ClassHierarchy,
        ResourceKind::FrameInventory,
        ResourceKind::PredicateBank,
        ResourceKind::SenseInventory,
        ResourceKind::SynsetNetwork,
        ResourceKind::CategoryMapping,
        ResourceKind::SemanticNetwork,
        ResourceKind::ReferenceDoc,
    ];

    /// Canonical name used in reports and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ClassHierarchy => "ClassHierarchy",
            ResourceKind::FrameInventory => "FrameInventory",
            ResourceKind::PredicateBank => "PredicateBank",
            ResourceKind::SenseInventory => "SenseInventory",
            ResourceKind::SynsetNetwork => "SynsetNetwork",
            ResourceKind::CategoryMapping => "CategoryMapping",
            ResourceKind::SemanticNetwork => "SemanticNetwork",
            ResourceKind::ReferenceDoc => "ReferenceDoc",
        }
    }

    /// Whether entries of this resource nest into a parent/child tree.
    pub fn supports_hierarchy(&self) -> bool {
        matches!(
            self,
            ResourceKind::ClassHierarchy
                | ResourceKind::FrameInventory
                | ResourceKind::PredicateBank
                | ResourceKind::SenseInventory
        )
    }

    /// Parse a list of resource names, failing on the first unknown one.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<ResourceKind>, QueryError> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = QueryError;

    /// Accepts the PascalCase name or its snake_case spelling, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().to_lowercase() == folded)
            .ok_or_else(|| QueryError::InvalidResource(s.to_string()))
    }
}

// ============================================================================
// Entity Keys
// ============================================================================

/// Globally unique address of an entity: `(kind, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: ResourceKind,
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// ============================================================================
// Structured Sub-fields
// ============================================================================

/// Category of a structured sub-field, shared across resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    /// Thematic role or frame element.
    Role,
    /// Semantic predicate.
    Predicate,
    /// Syntactic restriction on a frame slot.
    SyntacticRestriction,
    /// Selectional restriction on a role.
    SelectionalRestriction,
    /// Resource-specific feature.
    Feature,
}

impl PatternCategory {
    pub const ALL: [PatternCategory; 5] = [
        PatternCategory::Role,
        PatternCategory::Predicate,
        PatternCategory::SyntacticRestriction,
        PatternCategory::SelectionalRestriction,
        PatternCategory::Feature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCategory::Role => "role",
            PatternCategory::Predicate => "predicate",
            PatternCategory::SyntacticRestriction => "syntactic_restriction",
            PatternCategory::SelectionalRestriction => "selectional_restriction",
            PatternCategory::Feature => "feature",
        }
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternCategory {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "role" | "roles" | "themrole" | "themroles" => Ok(PatternCategory::Role),
            "predicate" | "predicates" => Ok(PatternCategory::Predicate),
            "syntactic_restriction" | "syntactic_restrictions" | "syntacticrestriction"
            | "synrestr" => Ok(PatternCategory::SyntacticRestriction),
            "selectional_restriction" | "selectional_restrictions"
            | "selectionalrestriction" | "selrestr" => Ok(PatternCategory::SelectionalRestriction),
            "feature" | "features" | "verb_specific_features" => Ok(PatternCategory::Feature),
            _ => Err(QueryError::InvalidPatternType(s.to_string())),
        }
    }
}

/// One structured sub-field value declared by an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub category: PatternCategory,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

// ============================================================================
// Entity
// ============================================================================

/// The atomic record parsed from any resource.
///
/// A fixed canonical core (`name`, `definition`, `pos`) sits next to an open
/// `extra` map for everything resource-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Resource this entity belongs to.
    pub kind: ResourceKind,
    /// Identifier, unique within `kind`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Definition or gloss text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    /// Part of speech, when the resource records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    /// Alternate keys other resources use to address this entity.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Surface word forms covered by this entity, in source order.
    #[serde(default)]
    pub member_lexemes: Vec<String>,
    /// Roles, predicates, restrictions and features declared by this entity.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Resource-specific data not promoted to canonical fields.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
    /// File the entity was parsed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl Entity {
    /// Create a new entity with the given kind, id and name.
    pub fn new(kind: ResourceKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            definition: None,
            pos: None,
            aliases: Vec::new(),
            member_lexemes: Vec::new(),
            annotations: Vec::new(),
            extra: BTreeMap::new(),
            source_file: None,
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.kind, self.id.clone())
    }

    /// Set the definition; blank text is treated as absent.
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        let definition = definition.into();
        let trimmed = definition.trim();
        self.definition = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        let pos = pos.into();
        self.pos = (!pos.is_empty()).then_some(pos);
        self
    }

    pub fn with_source_file(mut self, path: impl Into<String>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    /// Add a member lexeme, skipping blanks and exact duplicates.
    pub fn add_member(&mut self, lexeme: impl Into<String>) {
        let lexeme = lexeme.into();
        let lexeme = lexeme.trim();
        if !lexeme.is_empty() && !self.member_lexemes.iter().any(|m| m == lexeme) {
            self.member_lexemes.push(lexeme.to_string());
        }
    }

    pub fn with_members(mut self, lexemes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for lexeme in lexemes {
            self.add_member(lexeme);
        }
        self
    }

    /// Add an alias, skipping blanks and duplicates.
    pub fn add_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        let alias = alias.trim();
        if !alias.is_empty() && alias != self.id && !self.aliases.iter().any(|a| a == alias) {
            self.aliases.push(alias.to_string());
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.add_alias(alias);
        self
    }

    /// Record a structured sub-field value.
    pub fn annotate(
        &mut self,
        category: PatternCategory,
        name: impl Into<String>,
        definition: Option<String>,
    ) {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let definition = definition
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if self
            .annotations
            .iter()
            .any(|a| a.category == category && a.name == name)
        {
            return;
        }
        self.annotations.push(Annotation {
            category,
            name: name.to_string(),
            definition,
        });
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Append a verbatim cross-resource key under `field` (a JSON string array).
    pub fn push_reference(&mut self, field: &str, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let entry = self
            .extra
            .entry(field.to_string())
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        if let serde_json::Value::Array(values) = entry {
            if !values.iter().any(|v| v.as_str() == Some(value)) {
                values.push(serde_json::Value::String(value.to_string()));
            }
        }
    }

    /// Verbatim cross-resource keys stored under `field`.
    pub fn references(&self, field: &str) -> Vec<&str> {
        match self.extra.get(field) {
            Some(serde_json::Value::Array(values)) => {
                values.iter().filter_map(|v| v.as_str()).collect()
            }
            Some(serde_json::Value::String(value)) => vec![value.as_str()],
            _ => Vec::new(),
        }
    }

    /// Annotation names of one category.
    pub fn annotation_names(&self, category: PatternCategory) -> impl Iterator<Item = &str> {
        self.annotations
            .iter()
            .filter(move |a| a.category == category)
            .map(|a| a.name.as_str())
    }

    /// Lowercased member lexemes, the set used for lemma matching and inference.
    pub fn normalized_members(&self) -> Vec<String> {
        let mut members: Vec<String> = self
            .member_lexemes
            .iter()
            .map(|m| normalize_lemma(m))
            .filter(|m| !m.is_empty())
            .collect();
        members.sort();
        members.dedup();
        members
    }

    /// Whether a normalized lemma matches a member lexeme or the name.
    pub fn matches_lemma(&self, normalized: &str) -> bool {
        normalize_lemma(&self.name) == normalized
            || self
                .member_lexemes
                .iter()
                .any(|m| normalize_lemma(m) == normalized)
    }

    /// Fold a later record of the same entity into this one.
    ///
    /// List fields are unioned in first-seen order, missing scalars are filled
    /// in and extra fields are merged key by key.
    pub fn merge(&mut self, other: Entity) {
        if self.definition.is_none() {
            self.definition = other.definition;
        }
        if self.pos.is_none() {
            self.pos = other.pos;
        }
        if self.source_file.is_none() {
            self.source_file = other.source_file;
        }
        for alias in other.aliases {
            self.add_alias(alias);
        }
        for member in other.member_lexemes {
            self.add_member(member);
        }
        for annotation in other.annotations {
            self.annotate(annotation.category, annotation.name, annotation.definition);
        }
        for (key, value) in other.extra {
            match self.extra.get_mut(&key) {
                Some(existing) => merge_value(existing, value),
                None => {
                    self.extra.insert(key, value);
                }
            }
        }
    }
}

fn merge_value(existing: &mut serde_json::Value, incoming: serde_json::Value) {
    use serde_json::Value;
    match (existing, incoming) {
        (Value::Array(values), Value::Array(more)) => {
            for value in more {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
        (Value::Object(fields), Value::Object(more)) => {
            for (key, value) in more {
                match fields.get_mut(&key) {
                    Some(current) => merge_value(current, value),
                    None => {
                        fields.insert(key, value);
                    }
                }
            }
        }
        // Scalars: the first record wins.
        _ => {}
    }
}

/// Case-normalize a lemma token for exact matching. Multiword separators
/// (`hand_over`, `hand over`) compare equal.
pub fn normalize_lemma(lemma: &str) -> String {
    lemma.trim().to_lowercase().replace('_', " ")
}

// ============================================================================
// Hierarchy and Relations
// ============================================================================

/// Parent/child link inside one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HierarchyEdge {
    pub kind: ResourceKind,
    pub parent_id: String,
    pub child_id: String,
}

impl HierarchyEdge {
    pub fn new(kind: ResourceKind, parent_id: impl Into<String>, child_id: impl Into<String>) -> Self {
        Self {
            kind,
            parent_id: parent_id.into(),
            child_id: child_id.into(),
        }
    }
}

/// A typed relation between two entries of one resource, such as the
/// frame-to-frame relations of a frame inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub kind: ResourceKind,
    pub relation: String,
    pub super_id: String,
    pub sub_id: String,
}

// ============================================================================
// Parse Statistics
// ============================================================================

/// A file that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// Per-resource parse counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Files (or file groups) the adapter attempted.
    pub attempted: usize,
    /// Files parsed without error.
    pub succeeded: usize,
    /// Files that failed and were skipped.
    pub failed: usize,
    /// Individual records skipped inside otherwise readable files.
    #[serde(default)]
    pub skipped_records: usize,
    /// One entry per failed file.
    #[serde(default)]
    pub errors: Vec<FileError>,
}

impl ParseStats {
    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, file: impl Into<String>, message: impl Into<String>) {
        self.attempted += 1;
        self.failed += 1;
        self.errors.push(FileError {
            file: file.into(),
            message: message.into(),
        });
    }

    pub fn merge(&mut self, other: ParseStats) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped_records += other.skipped_records;
        self.errors.extend(other.errors);
    }
}

// ============================================================================
// Explicit Reference Keys
// ============================================================================

/// Synset keys: sense keys (`give%2:40:00`) or `lemma#pos#n` sense numbers.
pub const WORDNET_KEYS: &str = "wordnet_keys";
/// Class ids (`give-13.1`) or class numbers (`13.1`).
pub const VERBNET_CLASSES: &str = "verbnet_classes";
/// Roleset ids (`give.01`).
pub const PROPBANK_ROLESETS: &str = "propbank_rolesets";
/// Frame names (`Giving`).
pub const FRAMENET_FRAMES: &str = "framenet_frames";
/// Sense grouping ids (`give-v.1`).
pub const ONTONOTES_SENSES: &str = "ontonotes_senses";

/// Extra-field keys holding verbatim cross-resource references, with the
/// resource each one points into.
pub const EXPLICIT_REF_KEYS: &[(&str, ResourceKind)] = &[
    (WORDNET_KEYS, ResourceKind::SynsetNetwork),
    (VERBNET_CLASSES, ResourceKind::ClassHierarchy),
    (PROPBANK_ROLESETS, ResourceKind::PredicateBank),
    (FRAMENET_FRAMES, ResourceKind::FrameInventory),
    (ONTONOTES_SENSES, ResourceKind::SenseInventory),
];

/// Normalize a verbatim reference key before lookup: trims whitespace, a
/// leading `?` (uncertain mapping marker) and a trailing `::`.
pub fn normalize_reference_key(raw: &str) -> String {
    let key = raw.trim().trim_start_matches('?');
    let key = key.strip_suffix("::").unwrap_or(key);
    key.trim().to_string()
}
