//! Frame inventory adapter (FrameNet-style namespaced XML).
//!
//! Handles both per-frame files (`<frame>`) and the frame relation file
//! (`<frameRelations>`). Inheritance relations become hierarchy edges;
//! every relation is also kept as a [`RelationRecord`].

use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use super::traits::{read_text, source_name, FormatAdapter, ParseTask, TaskOutput};
use super::xml::{parse_expecting, XmlElement};
use crate::error::ParseError;
use crate::model::{Entity, HierarchyEdge, PatternCategory, RelationRecord, ResourceKind};
use crate::sources::layout_for;

/// Relation type that folds into the hierarchy.
pub const INHERITANCE: &str = "Inheritance";

static RE_MARKUP: OnceLock<Regex> = OnceLock::new();
static RE_SPACES: OnceLock<Regex> = OnceLock::new();

/// Strip inline definition markup (`<def-root>`, `<fex>`, ...) and collapse whitespace.
fn clean_definition(raw: &str) -> String {
    let re_markup = RE_MARKUP.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"\s+").unwrap());
    let stripped = re_markup.replace_all(raw, " ");
    re_spaces.replace_all(stripped.trim(), " ").to_string()
}

/// Split a lexical unit name into lemma and part of speech: `give up.v` → (`give up`, `v`).
fn split_lexical_unit(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((lemma, pos)) if !pos.is_empty() && pos.chars().all(|c| c.is_ascii_alphabetic()) => {
            (lemma, Some(pos))
        }
        _ => (name, None),
    }
}

#[derive(Debug, Default)]
pub struct FrameInventoryAdapter;

impl FrameInventoryAdapter {
    pub fn new() -> Self {
        Self
    }

    fn parse_frame(&self, root: &XmlElement, source: &str) -> Result<Entity, ParseError> {
        let name = root.require_attr("name")?;
        let mut entity = Entity::new(ResourceKind::FrameInventory, name, name)
            .with_source_file(source);

        if let Some(id) = root.attr("ID") {
            entity.add_alias(id);
        }
        if let Some(ns) = &root.namespace {
            entity.extra.insert("namespace".to_string(), json!(ns));
        }
        if let Some(def) = root.child_text("definition") {
            entity = entity.with_definition(clean_definition(&def));
        }

        let mut core_types = serde_json::Map::new();
        for fe in root.children_named("FE") {
            let Some(fe_name) = fe.attr("name").filter(|n| !n.trim().is_empty()) else {
                continue;
            };
            let definition = fe.child_text("definition").map(|d| clean_definition(&d));
            entity.annotate(PatternCategory::Role, fe_name, definition);
            if let Some(core) = fe.attr("coreType") {
                core_types.insert(fe_name.to_string(), json!(core));
            }
        }
        if !core_types.is_empty() {
            entity
                .extra
                .insert("core_types".to_string(), serde_json::Value::Object(core_types));
        }

        let mut units = Vec::new();
        for lu in root.children_named("lexUnit") {
            let Some(lu_name) = lu.attr("name").filter(|n| !n.trim().is_empty()) else {
                continue;
            };
            let (lemma, pos) = split_lexical_unit(lu_name.trim());
            entity.add_member(lemma);
            units.push(json!({
                "name": lu_name,
                "id": lu.attr("ID"),
                "pos": pos.map(str::to_string).or_else(|| lu.attr("POS").map(str::to_lowercase)),
            }));
        }
        if !units.is_empty() {
            entity
                .extra
                .insert("lexical_units".to_string(), serde_json::Value::Array(units));
        }

        let mut in_frame = Vec::new();
        for relation in root.children_named("frameRelation") {
            let related: Vec<String> = relation
                .children_named("relatedFrame")
                .map(|r| r.attr("name").map(str::to_string).unwrap_or_else(|| r.text_content()))
                .filter(|r| !r.is_empty())
                .collect();
            if !related.is_empty() {
                in_frame.push(json!({
                    "type": relation.attr("type").unwrap_or_default(),
                    "related": related,
                }));
            }
        }
        if !in_frame.is_empty() {
            entity
                .extra
                .insert("frame_relations".to_string(), serde_json::Value::Array(in_frame));
        }

        let semtypes: Vec<&str> = root
            .children_named("semType")
            .filter_map(|s| s.attr("name"))
            .collect();
        if !semtypes.is_empty() {
            entity.extra.insert("semtypes".to_string(), json!(semtypes));
        }

        Ok(entity)
    }

    fn parse_relations(&self, root: &XmlElement, output: &mut TaskOutput) {
        for child in &root.children {
            match child.name.as_str() {
                "frameRelationType" => {
                    let relation_type = child.attr("name").unwrap_or_default().trim();
                    for relation in child.children_named("frameRelation") {
                        let relation_type = relation.attr("type").unwrap_or(relation_type);
                        push_relation(relation_type, relation, output);
                    }
                }
                "frameRelation" => {
                    let relation_type = child.attr("type").unwrap_or_default();
                    push_relation(relation_type, child, output);
                }
                _ => {}
            }
        }
    }
}

fn push_relation(relation_type: &str, element: &XmlElement, output: &mut TaskOutput) {
    let super_id = element
        .attr("superFrameName")
        .or_else(|| element.attr("supFrame"))
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let sub_id = element
        .attr("subFrameName")
        .or_else(|| element.attr("subFrame"))
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (Some(super_id), Some(sub_id)) = (super_id, sub_id) else {
        output.skipped_records += 1;
        return;
    };
    if relation_type == INHERITANCE {
        output.edges.push(HierarchyEdge::new(
            ResourceKind::FrameInventory,
            super_id,
            sub_id,
        ));
    }
    output.relations.push(RelationRecord {
        kind: ResourceKind::FrameInventory,
        relation: relation_type.to_string(),
        super_id: super_id.to_string(),
        sub_id: sub_id.to_string(),
    });
}

impl FormatAdapter for FrameInventoryAdapter {
    fn name(&self) -> &'static str {
        "frame-inventory-xml"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::FrameInventory
    }

    fn parse_task(&self, task: &ParseTask) -> Result<TaskOutput, ParseError> {
        let content = read_text(&task.primary)?;
        let root = parse_expecting(&content, layout_for(self.kind()).expected_roots)?;
        let mut output = TaskOutput::default();
        if root.name == "frameRelations" {
            self.parse_relations(&root, &mut output);
        } else {
            output
                .entities
                .push(self.parse_frame(&root, &source_name(&task.primary))?);
        }
        Ok(output)
    }
}
