//! Class hierarchy adapter (VerbNet-style `VNCLASS` files).
//!
//! One file holds one top-level class; `VNSUBCLASS` elements nest
//! arbitrarily deep and become child entities linked by hierarchy edges.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use super::traits::{read_text, source_name, FormatAdapter, ParseTask, TaskOutput};
use super::xml::{parse_expecting, XmlElement};
use crate::error::ParseError;
use crate::model::{
    Entity, HierarchyEdge, PatternCategory, ResourceKind, FRAMENET_FRAMES, ONTONOTES_SENSES,
    WORDNET_KEYS,
};
use crate::sources::layout_for;

static RE_CLASS_NUMBER: OnceLock<Regex> = OnceLock::new();

/// Numeric part of a class id: `give-13.1-1` → `13.1-1`.
pub fn class_number(class_id: &str) -> Option<&str> {
    let re = RE_CLASS_NUMBER.get_or_init(|| Regex::new(r"-(\d+(?:[.\-]\d+)*)$").unwrap());
    re.captures(class_id)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Adapter for hierarchical verb class files.
#[derive(Debug, Default)]
pub struct ClassHierarchyAdapter;

impl ClassHierarchyAdapter {
    pub fn new() -> Self {
        Self
    }

    fn parse_class(
        &self,
        element: &XmlElement,
        parent_id: Option<&str>,
        source: &str,
        namespace: Option<&str>,
        output: &mut TaskOutput,
    ) -> Result<(), ParseError> {
        let id = element.require_attr("ID")?.to_string();
        let mut entity = Entity::new(ResourceKind::ClassHierarchy, &id, &id)
            .with_pos("v")
            .with_source_file(source);

        if let Some(number) = class_number(&id) {
            entity.add_alias(number);
        }
        if let Some(ns) = namespace {
            entity.extra.insert("namespace".to_string(), json!(ns));
        }

        read_members(element, &mut entity);
        read_roles(element, &mut entity);
        read_frames(element, &mut entity);

        output.entities.push(entity);
        if let Some(parent) = parent_id {
            output.edges.push(HierarchyEdge::new(
                ResourceKind::ClassHierarchy,
                parent,
                &id,
            ));
        }

        if let Some(subclasses) = element.child("SUBCLASSES") {
            for sub in subclasses.children_named("VNSUBCLASS") {
                self.parse_class(sub, Some(&id), source, namespace, output)?;
            }
        }
        Ok(())
    }
}

fn read_members(element: &XmlElement, entity: &mut Entity) {
    let Some(members) = element.child("MEMBERS") else {
        return;
    };
    let mut details = Vec::new();
    for member in members.children_named("MEMBER") {
        let Some(name) = member.attr("name").map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };
        entity.add_member(name);

        for key in split_values(member.attr("wn")) {
            entity.push_reference(WORDNET_KEYS, key);
        }
        for frame in split_values(member.attr("fn_mapping")) {
            if !frame.eq_ignore_ascii_case("none") {
                entity.push_reference(FRAMENET_FRAMES, frame);
            }
        }
        for sense in split_values(member.attr("grouping")) {
            entity.push_reference(ONTONOTES_SENSES, sense);
        }

        let mut detail = serde_json::Map::new();
        detail.insert("name".to_string(), json!(name));
        for attr in ["wn", "grouping", "fn_mapping", "features", "verbnet_key"] {
            if let Some(value) = member.attr(attr).filter(|v| !v.trim().is_empty()) {
                detail.insert(attr.to_string(), json!(value.trim()));
            }
        }
        details.push(serde_json::Value::Object(detail));
    }
    if !details.is_empty() {
        entity
            .extra
            .insert("members".to_string(), serde_json::Value::Array(details));
    }
}

fn read_roles(element: &XmlElement, entity: &mut Entity) {
    let Some(roles) = element.child("THEMROLES") else {
        return;
    };
    let mut restrictions = Vec::new();
    for role in roles.children_named("THEMROLE") {
        let Some(role_type) = role.attr("type").filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        entity.annotate(PatternCategory::Role, role_type, None);
        for restr in role.descendants_named("SELRESTR") {
            if let Some(restr_type) = restr.attr("type").filter(|t| !t.trim().is_empty()) {
                entity.annotate(PatternCategory::SelectionalRestriction, restr_type, None);
                restrictions.push(json!({
                    "role": role_type,
                    "value": restr.attr("Value").unwrap_or_default(),
                    "type": restr_type,
                }));
            }
        }
    }
    if !restrictions.is_empty() {
        entity.extra.insert(
            "selectional_restrictions".to_string(),
            serde_json::Value::Array(restrictions),
        );
    }
}

fn read_frames(element: &XmlElement, entity: &mut Entity) {
    let Some(frames) = element.child("FRAMES") else {
        return;
    };
    let mut summaries = Vec::new();
    for frame in frames.children_named("FRAME") {
        let description = frame
            .child("DESCRIPTION")
            .and_then(|d| d.attr("primary"))
            .unwrap_or_default()
            .to_string();
        let examples: Vec<String> = frame
            .descendants_named("EXAMPLE")
            .into_iter()
            .map(|e| e.text_content())
            .filter(|t| !t.is_empty())
            .collect();

        let mut syntax = Vec::new();
        if let Some(syn) = frame.child("SYNTAX") {
            for slot in &syn.children {
                syntax.push(match slot.attr("value") {
                    Some(value) if !value.is_empty() => format!("{} {}", slot.name, value),
                    _ => slot.name.clone(),
                });
                for restr in slot.descendants_named("SYNRESTR") {
                    if let Some(t) = restr.attr("type") {
                        entity.annotate(PatternCategory::SyntacticRestriction, t, None);
                    }
                }
            }
        }

        let mut predicates = Vec::new();
        for pred in frame.descendants_named("PRED") {
            if let Some(value) = pred.attr("value").filter(|v| !v.trim().is_empty()) {
                entity.annotate(PatternCategory::Predicate, value, None);
                predicates.push(value.to_string());
            }
        }

        summaries.push(json!({
            "description": description,
            "examples": examples,
            "syntax": syntax,
            "predicates": predicates,
        }));
    }
    if !summaries.is_empty() {
        entity
            .extra
            .insert("frames".to_string(), serde_json::Value::Array(summaries));
    }
}

/// Split a whitespace-separated attribute into its values.
fn split_values(value: Option<&str>) -> impl Iterator<Item = &str> {
    value.unwrap_or_default().split_whitespace()
}

impl FormatAdapter for ClassHierarchyAdapter {
    fn name(&self) -> &'static str {
        "class-hierarchy-xml"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::ClassHierarchy
    }

    fn parse_task(&self, task: &ParseTask) -> Result<TaskOutput, ParseError> {
        let content = read_text(&task.primary)?;
        let root = parse_expecting(&content, layout_for(self.kind()).expected_roots)?;
        let mut output = TaskOutput::default();
        self.parse_class(
            &root,
            None,
            &source_name(&task.primary),
            root.namespace.as_deref(),
            &mut output,
        )?;
        Ok(output)
    }
}
