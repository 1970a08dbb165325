//! Sense inventory adapter (OntoNotes-style `inventory` files).

use serde_json::json;

use super::traits::{read_text, source_name, FormatAdapter, ParseTask, TaskOutput};
use super::xml::{parse_expecting, XmlElement};
use crate::error::ParseError;
use crate::model::{
    Entity, HierarchyEdge, ResourceKind, FRAMENET_FRAMES, PROPBANK_ROLESETS, VERBNET_CLASSES,
    WORDNET_KEYS,
};
use crate::sources::layout_for;

#[derive(Debug, Default)]
pub struct SenseInventoryAdapter;

impl SenseInventoryAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// Split `give-v` into (`give`, `v`).
fn split_inventory_lemma(lemma: &str) -> (&str, Option<&str>) {
    match lemma.rsplit_once('-') {
        Some((bare, pos)) if matches!(pos, "n" | "v" | "j" | "a" | "r") => (bare, Some(pos)),
        _ => (lemma, None),
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "-" && !v.eq_ignore_ascii_case("nm"))
}

/// Record one mapping (`wn`, `pb`, `vn`, `fn`) on a sense entity.
fn apply_mapping(entity: &mut Entity, kind: &str, value: &str, bare: &str, pos: Option<&str>) {
    match kind.to_ascii_lowercase().as_str() {
        "wn" => {
            let wn_pos = match pos {
                Some("j") => "a",
                Some(p) => p,
                None => "v",
            };
            for sense in split_list(value) {
                if sense.chars().all(|c| c.is_ascii_digit()) {
                    entity.push_reference(WORDNET_KEYS, format!("{bare}#{wn_pos}#{sense}"));
                } else {
                    entity.push_reference(WORDNET_KEYS, sense);
                }
            }
        }
        "pb" => split_list(value).for_each(|v| entity.push_reference(PROPBANK_ROLESETS, v)),
        "vn" => split_list(value).for_each(|v| entity.push_reference(VERBNET_CLASSES, v)),
        "fn" => split_list(value).for_each(|v| entity.push_reference(FRAMENET_FRAMES, v)),
        _ => {}
    }
}

fn parse_sense(
    sense: &XmlElement,
    inventory_id: &str,
    bare: &str,
    pos: Option<&str>,
    source: &str,
) -> Option<Entity> {
    let n = sense.attr("n").map(str::trim).filter(|n| !n.is_empty())?;
    let id = format!("{inventory_id}.{n}");
    let name = sense
        .attr("name")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&id)
        .to_string();

    let mut entity = Entity::new(ResourceKind::SenseInventory, &id, name)
        .with_members([bare.replace('_', " ")])
        .with_source_file(source);
    if let Some(pos) = pos {
        entity = entity.with_pos(pos);
    }
    if let Some(commentary) = sense.child_text("commentary") {
        entity = entity.with_definition(commentary);
    }
    if let Ok(number) = n.parse::<u32>() {
        entity.add_alias(format!("{bare}.{number:02}"));
    }
    if let Some(group) = sense.attr("group").filter(|g| !g.trim().is_empty()) {
        entity.extra.insert("group".to_string(), json!(group.trim()));
    }

    if let Some(mappings) = sense.child("mappings") {
        for mapping in &mappings.children {
            apply_mapping(&mut entity, &mapping.name, &mapping.text_content(), bare, pos);
            if mapping.name == "wn" {
                if let Some(version) = mapping.attr("version") {
                    entity.extra.insert("wn_version".to_string(), json!(version));
                }
            }
        }
    }
    for mapping in sense.descendants_named("mapping") {
        if let (Some(kind), Some(value)) = (mapping.attr("type"), mapping.attr("value")) {
            apply_mapping(&mut entity, kind, value, bare, pos);
        }
    }

    let examples: Vec<String> = sense
        .descendants_named("examples")
        .into_iter()
        .flat_map(|e| e.text.lines().map(str::trim).map(str::to_string).collect::<Vec<_>>())
        .filter(|l| !l.is_empty())
        .collect();
    if !examples.is_empty() {
        entity.extra.insert("examples".to_string(), json!(examples));
    }

    Some(entity)
}

impl FormatAdapter for SenseInventoryAdapter {
    fn name(&self) -> &'static str {
        "sense-inventory-xml"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::SenseInventory
    }

    fn parse_task(&self, task: &ParseTask) -> Result<TaskOutput, ParseError> {
        let content = read_text(&task.primary)?;
        let root = parse_expecting(&content, layout_for(self.kind()).expected_roots)?;
        let source = source_name(&task.primary);
        let inventory_id = root.require_attr("lemma")?;
        let (bare, pos) = split_inventory_lemma(inventory_id);

        let mut parent = Entity::new(ResourceKind::SenseInventory, inventory_id, bare)
            .with_members([bare.replace('_', " ")])
            .with_source_file(&source);
        if let Some(pos) = pos {
            parent = parent.with_pos(pos);
        }
        if let Some(commentary) = root.child_text("commentary") {
            parent = parent.with_definition(commentary);
        }

        let mut output = TaskOutput::default();
        output.entities.push(parent);

        for sense in root.children_named("sense") {
            match parse_sense(sense, inventory_id, bare, pos, &source) {
                Some(entity) => {
                    output.edges.push(HierarchyEdge::new(
                        ResourceKind::SenseInventory,
                        inventory_id,
                        &entity.id,
                    ));
                    output.entities.push(entity);
                }
                None => output.skipped_records += 1,
            }
        }
        Ok(output)
    }
}
