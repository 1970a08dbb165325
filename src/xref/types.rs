use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::EntityKey;

/// `via` value of inferred links.
pub const MEMBER_LEXEMES: &str = "member_lexemes";

/// How a cross reference was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Copied verbatim from a source file.
    Explicit,
    /// Derived from member lexemes both entities share.
    InferredBySharedMember,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Explicit => "explicit",
            LinkKind::InferredBySharedMember => "inferred_by_shared_member",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            LinkKind::Explicit => 0,
            LinkKind::InferredBySharedMember => 1,
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed link between two entities of different resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    pub source: EntityKey,
    /// For an unresolved link, `target.id` is the raw key from the source file.
    pub target: EntityKey,
    pub kind: LinkKind,
    /// 1.0 for explicit links, Jaccard similarity of member sets for inferred ones.
    pub confidence: f64,
    #[serde(default)]
    pub unresolved: bool,
    /// Extra-field key (or `member_lexemes`) that produced the link.
    pub via: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_members: Vec<String>,
}

impl CrossReference {
    pub fn explicit(source: EntityKey, target: EntityKey, via: &str, unresolved: bool) -> Self {
        Self {
            source,
            target,
            kind: LinkKind::Explicit,
            confidence: 1.0,
            unresolved,
            via: via.to_string(),
            shared_members: Vec::new(),
        }
    }

    pub fn inferred(source: EntityKey, target: EntityKey, shared_members: Vec<String>, confidence: f64) -> Self {
        Self {
            source,
            target,
            kind: LinkKind::InferredBySharedMember,
            confidence,
            unresolved: false,
            via: MEMBER_LEXEMES.to_string(),
            shared_members,
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.kind == LinkKind::Explicit
    }

    /// The same link seen from its target.
    pub fn flipped(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
            ..self.clone()
        }
    }

    /// Display order: explicit first, confidence descending, larger shared
    /// set first, then target id.
    pub fn display_order(a: &Self, b: &Self) -> Ordering {
        a.kind
            .rank()
            .cmp(&b.kind.rank())
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| b.shared_members.len().cmp(&a.shared_members.len()))
            .then_with(|| a.target.id.cmp(&b.target.id))
            .then_with(|| a.target.kind.cmp(&b.target.kind))
            .then_with(|| a.via.cmp(&b.via))
    }

    /// Query order: confidence descending, explicit first at equal confidence.
    pub fn confidence_order(a: &Self, b: &Self) -> Ordering {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.kind.rank().cmp(&b.kind.rank()))
            .then_with(|| b.shared_members.len().cmp(&a.shared_members.len()))
            .then_with(|| a.target.id.cmp(&b.target.id))
            .then_with(|| a.target.kind.cmp(&b.target.kind))
    }
}
