//! Reference definition tables (JSON and TSV).
//!
//! Each file defines one vocabulary: predicates, thematic roles, constants or
//! verb-specific features. The vocabulary is inferred from the file name and
//! decides which annotation category the entries feed.

use std::path::Path;

use serde_json::{json, Map, Value};

use super::delimited::parse_table;
use super::traits::{file_stem, read_text, source_name, FormatAdapter, ParseTask, TaskOutput};
use crate::error::ParseError;
use crate::model::{Entity, PatternCategory, ResourceKind};

/// Vocabulary a reference file defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceCategory {
    Predicate,
    ThematicRole,
    Constant,
    VerbSpecific,
    General,
}

impl ReferenceCategory {
    /// Infer the vocabulary from a file name such as `vn_constants.tsv`.
    pub fn from_file_name(path: &Path) -> Self {
        let stem = file_stem(path).to_lowercase();
        if stem.contains("verb_specific") {
            ReferenceCategory::VerbSpecific
        } else if stem.contains("pred") {
            ReferenceCategory::Predicate
        } else if stem.contains("themrole") || stem.contains("role") {
            ReferenceCategory::ThematicRole
        } else if stem.contains("constant") {
            ReferenceCategory::Constant
        } else {
            ReferenceCategory::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceCategory::Predicate => "predicate",
            ReferenceCategory::ThematicRole => "themrole",
            ReferenceCategory::Constant => "constant",
            ReferenceCategory::VerbSpecific => "verb_specific",
            ReferenceCategory::General => "reference",
        }
    }

    /// Annotation category entries of this vocabulary contribute to.
    pub fn pattern_category(&self) -> Option<PatternCategory> {
        match self {
            ReferenceCategory::Predicate => Some(PatternCategory::Predicate),
            ReferenceCategory::ThematicRole => Some(PatternCategory::Role),
            ReferenceCategory::VerbSpecific => Some(PatternCategory::Feature),
            ReferenceCategory::Constant | ReferenceCategory::General => None,
        }
    }
}

const NAME_KEYS: &[&str] = &["name", "predicate", "role", "themrole", "constant", "feature"];
const DEFINITION_KEYS: &[&str] = &["definition", "description", "gloss"];

#[derive(Debug, Default)]
pub struct ReferenceDocAdapter;

impl ReferenceDocAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn text_of(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| fields.get(*k).and_then(text_of))
}

fn make_entry(
    category: ReferenceCategory,
    name: &str,
    definition: Option<String>,
    extra: Map<String, Value>,
    source: &str,
) -> Entity {
    let mut entity = Entity::new(
        ResourceKind::ReferenceDoc,
        format!("{}:{}", category.as_str(), name),
        name,
    )
    .with_source_file(source)
    .with_extra("category", json!(category.as_str()));
    if let Some(def) = &definition {
        entity = entity.with_definition(def.as_str());
    }
    if let Some(pattern) = category.pattern_category() {
        entity.annotate(pattern, name, definition);
    }
    for (key, value) in extra {
        if !value.is_null() {
            entity.extra.insert(key, value);
        }
    }
    entity
}

fn parse_json(
    content: &str,
    category: ReferenceCategory,
    source: &str,
    output: &mut TaskOutput,
) -> Result<(), ParseError> {
    let root: Value = serde_json::from_str(content)?;
    let entries: Vec<(Option<String>, Value)> = match root {
        Value::Object(map) => map.into_iter().map(|(k, v)| (Some(k), v)).collect(),
        Value::Array(list) => list.into_iter().map(|v| (None, v)).collect(),
        _ => {
            return Err(ParseError::Malformed(
                "expected a JSON object or list of definitions".to_string(),
            ))
        }
    };

    for (key, value) in entries {
        let (name, definition, extra) = match value {
            Value::String(text) => (key, Some(text), Map::new()),
            Value::Object(mut fields) => {
                let name = key.or_else(|| first_text(&fields, NAME_KEYS));
                let definition = first_text(&fields, DEFINITION_KEYS);
                for k in NAME_KEYS.iter().chain(DEFINITION_KEYS) {
                    fields.remove(*k);
                }
                (name, definition, fields)
            }
            _ => (None, None, Map::new()),
        };
        match name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            Some(name) => output
                .entities
                .push(make_entry(category, &name, definition, extra, source)),
            None => output.skipped_records += 1,
        }
    }
    Ok(())
}

fn parse_tsv(
    content: &str,
    category: ReferenceCategory,
    source: &str,
    output: &mut TaskOutput,
) -> Result<(), ParseError> {
    let table = parse_table(content)?;
    output.skipped_records += table.skipped;
    let name_col = table.column(NAME_KEYS).unwrap_or(0);
    let definition_col = table.column(DEFINITION_KEYS);

    for row in &table.rows {
        let name = row[name_col].trim();
        if name.is_empty() {
            output.skipped_records += 1;
            continue;
        }
        let definition = definition_col
            .map(|col| row[col].trim().to_string())
            .filter(|d| !d.is_empty());
        let extra: Map<String, Value> = table
            .headers
            .iter()
            .zip(row)
            .enumerate()
            .filter(|(i, (_, cell))| *i != name_col && Some(*i) != definition_col && !cell.is_empty())
            .map(|(_, (header, cell))| (header.to_lowercase(), json!(cell)))
            .collect();
        output
            .entities
            .push(make_entry(category, name, definition, extra, source));
    }
    Ok(())
}

impl FormatAdapter for ReferenceDocAdapter {
    fn name(&self) -> &'static str {
        "reference-doc"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::ReferenceDoc
    }

    fn parse_task(&self, task: &ParseTask) -> Result<TaskOutput, ParseError> {
        let content = read_text(&task.primary)?;
        let category = ReferenceCategory::from_file_name(&task.primary);
        let source = source_name(&task.primary);
        let mut output = TaskOutput::default();

        let is_json = task
            .primary
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            parse_json(&content, category, &source, &mut output)?;
        } else {
            parse_tsv(&content, category, &source, &mut output)?;
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(name: &str, content: &str) -> TaskOutput {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        ReferenceDocAdapter::new()
            .parse_task(&ParseTask::single(path))
            .unwrap()
    }

    #[test]
    fn test_category_from_file_name() {
        let cases = [
            ("pred_calc_for_website_final.json", ReferenceCategory::Predicate),
            ("themrole_defs.json", ReferenceCategory::ThematicRole),
            ("vn_constants.tsv", ReferenceCategory::Constant),
            ("vn_semantic_predicates.tsv", ReferenceCategory::Predicate),
            ("vn_verb_specific_predicates.tsv", ReferenceCategory::VerbSpecific),
            ("notes.json", ReferenceCategory::General),
        ];
        for (name, expected) in cases {
            assert_eq!(ReferenceCategory::from_file_name(Path::new(name)), expected);
        }
    }

    #[test]
    fn test_json_predicates() {
        let output = parse(
            "pred_calc_for_website_final.json",
            r#"{
                "has_possession": {"definition": "Participant has possession of an entity", "arguments": ["e", "x", "y"]},
                "transfer": "Transfer of an entity",
                "broken": 42
            }"#,
        );
        assert_eq!(output.entities.len(), 2);
        assert_eq!(output.skipped_records, 1);
        let pred = &output.entities[0];
        assert_eq!(pred.id, "predicate:has_possession");
        assert_eq!(pred.annotations[0].category, PatternCategory::Predicate);
        assert_eq!(
            pred.annotations[0].definition.as_deref(),
            Some("Participant has possession of an entity")
        );
        assert_eq!(pred.extra["arguments"], json!(["e", "x", "y"]));
    }

    #[test]
    fn test_json_object_keeps_file_order() {
        let output = parse(
            "pred_calc_for_website_final.json",
            r#"{"transfer": "Transfer of an entity", "cause": "Causation", "motion": "Change of location"}"#,
        );
        let ids: Vec<_> = output.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["predicate:transfer", "predicate:cause", "predicate:motion"]
        );
    }

    #[test]
    fn test_json_role_list() {
        let output = parse(
            "themrole_defs.json",
            r#"[{"name": "Agent", "description": "Actor in an event"}]"#,
        );
        let agent = &output.entities[0];
        assert_eq!(agent.id, "themrole:Agent");
        assert_eq!(agent.definition.as_deref(), Some("Actor in an event"));
        assert_eq!(agent.annotations[0].category, PatternCategory::Role);
    }

    #[test]
    fn test_tsv_constants() {
        let output = parse(
            "vn_constants.tsv",
            "constant\tdefinition\ttype\nEnd\tEnd of an event\ttemporal\n\tno name\t\n",
        );
        assert_eq!(output.entities.len(), 1);
        assert_eq!(output.skipped_records, 1);
        let end = &output.entities[0];
        assert_eq!(end.id, "constant:End");
        assert!(end.annotations.is_empty());
        assert_eq!(end.extra["type"], json!("temporal"));
        assert_eq!(end.extra["category"], json!("constant"));
    }
}
