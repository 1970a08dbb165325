use std::fmt;

use serde_json::Value;

use crate::model::{Entity, ResourceKind, VERBNET_CLASSES};

/// A field an entity of some kind must populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Name,
    Definition,
    Pos,
    Members,
    /// A non-empty value under this extra-map key.
    Extra(&'static str),
}

impl RequiredField {
    pub fn is_present(&self, entity: &Entity) -> bool {
        match self {
            RequiredField::Name => !entity.name.trim().is_empty(),
            RequiredField::Definition => entity.definition.is_some(),
            RequiredField::Pos => entity.pos.is_some(),
            RequiredField::Members => !entity.member_lexemes.is_empty(),
            RequiredField::Extra(key) => match entity.extra.get(*key) {
                None | Some(Value::Null) => false,
                Some(Value::Array(values)) => !values.is_empty(),
                Some(Value::String(s)) => !s.is_empty(),
                Some(Value::Object(map)) => !map.is_empty(),
                Some(_) => true,
            },
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiredField::Name => f.write_str("name"),
            RequiredField::Definition => f.write_str("definition"),
            RequiredField::Pos => f.write_str("pos"),
            RequiredField::Members => f.write_str("member_lexemes"),
            RequiredField::Extra(key) => write!(f, "extra.{key}"),
        }
    }
}

/// Default rule table.
pub fn required_fields(kind: ResourceKind) -> &'static [RequiredField] {
    use RequiredField::*;
    match kind {
        ResourceKind::ClassHierarchy => &[Name, Members],
        ResourceKind::FrameInventory => &[Name, Definition],
        ResourceKind::PredicateBank => &[Name],
        ResourceKind::SenseInventory => &[Name],
        ResourceKind::SynsetNetwork => &[Name, Pos, Definition, Members],
        ResourceKind::CategoryMapping => &[Name, Extra(VERBNET_CLASSES)],
        ResourceKind::SemanticNetwork => &[Name, Members],
        ResourceKind::ReferenceDoc => &[Name, Extra("category")],
    }
}
