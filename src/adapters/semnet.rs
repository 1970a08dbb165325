//! Semantic network adapter (SemNet-style JSON).
//!
//! Nodes may be given as an object keyed by id, a list of node objects, or
//! (for older dumps) as top-level word entries. The network, `verb` or
//! `noun`, comes from the file name.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use super::traits::{file_stem, read_text, source_name, FormatAdapter, ParseTask, TaskOutput};
use crate::error::ParseError;
use crate::model::{Entity, ResourceKind, WORDNET_KEYS};

const NODE_FIELDS: &[&str] = &[
    "id",
    "word",
    "pos",
    "frequency",
    "semantic_class",
    "synsets",
    "relations",
    "definition",
];

#[derive(Debug, Default)]
pub struct SemanticNetworkAdapter;

impl SemanticNetworkAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// `verb-semnet.json` → `verb`
fn network_name(stem: &str) -> &'static str {
    let stem = stem.to_lowercase();
    if stem.contains("verb") {
        "verb"
    } else if stem.contains("noun") {
        "noun"
    } else {
        "node"
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalize the three accepted node layouts into `(id, info)` pairs.
fn collect_nodes(root: &Value) -> Result<Vec<(String, Value)>, ParseError> {
    let object = root
        .as_object()
        .ok_or_else(|| ParseError::Malformed("expected a JSON object".to_string()))?;

    match object.get("nodes") {
        Some(Value::Object(nodes)) => Ok(nodes
            .iter()
            .map(|(id, info)| (id.clone(), info.clone()))
            .collect()),
        Some(Value::Array(nodes)) => Ok(nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_object())
            .map(|(i, node)| {
                let id = node
                    .get("id")
                    .and_then(as_text)
                    .or_else(|| node.get("word").and_then(as_text))
                    .unwrap_or_else(|| i.to_string());
                (id, node.clone())
            })
            .collect()),
        Some(_) => Err(ParseError::Malformed(
            "'nodes' must be an object or a list".to_string(),
        )),
        None => Ok(object
            .iter()
            .filter(|(key, value)| {
                !matches!(key.as_str(), "edges" | "relationships" | "clusters" | "metadata")
                    && value.as_object().is_some_and(|o| !o.is_empty())
            })
            .map(|(id, info)| (id.clone(), info.clone()))
            .collect()),
    }
}

fn node_entity(network: &str, id: &str, info: &Value, source: &str) -> Entity {
    let empty = Map::new();
    let fields = info.as_object().unwrap_or(&empty);
    let word = fields
        .get("word")
        .and_then(as_text)
        .or_else(|| as_text(info))
        .unwrap_or_else(|| id.to_string());
    let pos = fields.get("pos").and_then(as_text).unwrap_or_else(|| {
        match network {
            "verb" => "v",
            "noun" => "n",
            _ => "",
        }
        .to_string()
    });

    let mut entity = Entity::new(ResourceKind::SemanticNetwork, format!("{network}:{id}"), &word)
        .with_pos(pos)
        .with_source_file(source)
        .with_members([word.as_str()]);
    entity.add_alias(id);
    if let Some(definition) = fields.get("definition").and_then(as_text) {
        entity = entity.with_definition(definition);
    }

    match fields.get("synsets") {
        Some(Value::Array(synsets)) => {
            for synset in synsets.iter().filter_map(as_text) {
                entity.push_reference(WORDNET_KEYS, synset);
            }
        }
        Some(other) => {
            if let Some(synset) = as_text(other) {
                entity.push_reference(WORDNET_KEYS, synset);
            }
        }
        None => {}
    }

    for key in ["frequency", "semantic_class", "relations"] {
        if let Some(value) = fields.get(key).filter(|v| !v.is_null()) {
            entity.extra.insert(key.to_string(), value.clone());
        }
    }
    let attributes: Map<String, Value> = fields
        .iter()
        .filter(|(k, _)| !NODE_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !attributes.is_empty() {
        entity
            .extra
            .insert("attributes".to_string(), Value::Object(attributes));
    }
    entity
}

/// Attach `edges`/`relationships` to their source nodes and `clusters` to
/// their members.
fn attach_links(root: &Value, entities: &mut [Entity], positions: &HashMap<String, usize>) {
    let edges = root
        .get("edges")
        .or_else(|| root.get("relationships"))
        .and_then(Value::as_array);
    for edge in edges.into_iter().flatten() {
        let (Some(source), Some(target)) = (
            edge.get("source").and_then(as_text),
            edge.get("target").and_then(as_text),
        ) else {
            continue;
        };
        if let Some(&idx) = positions.get(&source) {
            let link = json!({
                "target": target,
                "relation": edge.get("relation").and_then(as_text).unwrap_or_else(|| "related".to_string()),
                "weight": edge.get("weight").and_then(Value::as_f64).unwrap_or(1.0),
            });
            push_array(&mut entities[idx], "edges", link);
        }
    }

    let clusters: Vec<(String, &Value)> = match root.get("clusters") {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Some(Value::Array(list)) => list
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let id = c
                    .get("id")
                    .and_then(as_text)
                    .unwrap_or_else(|| format!("cluster_{i}"));
                (id, c)
            })
            .collect(),
        _ => Vec::new(),
    };
    for (cluster_id, cluster) in clusters {
        let members = cluster.get("members").and_then(Value::as_array);
        for member in members.into_iter().flatten().filter_map(as_text) {
            if let Some(&idx) = positions.get(&member) {
                push_array(&mut entities[idx], "clusters", json!(cluster_id));
            }
        }
    }
}

fn push_array(entity: &mut Entity, key: &str, value: Value) {
    let entry = entity
        .extra
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(values) = entry {
        values.push(value);
    }
}

impl FormatAdapter for SemanticNetworkAdapter {
    fn name(&self) -> &'static str {
        "semantic-network-json"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::SemanticNetwork
    }

    fn parse_task(&self, task: &ParseTask) -> Result<TaskOutput, ParseError> {
        let content = read_text(&task.primary)?;
        let root: Value = serde_json::from_str(&content)?;
        let network = network_name(&file_stem(&task.primary));
        let source = source_name(&task.primary);

        let nodes = collect_nodes(&root)?;
        let mut output = TaskOutput::default();
        let mut positions = HashMap::new();
        for (id, info) in nodes {
            if id.trim().is_empty() {
                output.skipped_records += 1;
                continue;
            }
            positions.insert(id.clone(), output.entities.len());
            output
                .entities
                .push(node_entity(network, &id, &info, &source));
        }
        attach_links(&root, &mut output.entities, &positions);
        Ok(output)
    }
}
