//! Predicate bank adapter (PropBank-style `frameset` files).
//!
//! Each `predicate` becomes a lemma entity and each of its `roleset`s a child
//! entity (`give.01`). Thematic labels from `vnrole`/`rolelink` become Role
//! annotations; numbered arguments stay in `extra.roles`.

use serde_json::json;

use super::traits::{read_text, source_name, FormatAdapter, ParseTask, TaskOutput};
use super::xml::{parse_expecting, XmlElement};
use crate::error::ParseError;
use crate::model::{
    Entity, HierarchyEdge, PatternCategory, ResourceKind, FRAMENET_FRAMES, VERBNET_CLASSES,
};
use crate::sources::layout_for;

#[derive(Debug, Default)]
pub struct PredicateBankAdapter;

impl PredicateBankAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// Values of a mapping attribute; `-` marks an absent mapping.
fn mapping_values(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "-")
}

fn parse_roleset(
    roleset: &XmlElement,
    lemma: &str,
    source: &str,
) -> Result<Entity, ParseError> {
    let id = roleset.require_attr("id")?;
    let name = roleset.attr("name").map(str::trim).filter(|n| !n.is_empty());
    let mut entity = Entity::new(ResourceKind::PredicateBank, id, name.unwrap_or(id))
        .with_pos("v")
        .with_source_file(source);
    if let Some(name) = name {
        entity = entity.with_definition(name);
    }

    for class in mapping_values(roleset.attr("vncls")) {
        entity.push_reference(VERBNET_CLASSES, class);
    }
    for frame in mapping_values(roleset.attr("framnet").or_else(|| roleset.attr("framenet"))) {
        entity.push_reference(FRAMENET_FRAMES, frame);
    }

    let mut has_alias = false;
    for alias in roleset.descendants_named("alias") {
        let text = alias.text_content();
        if !text.is_empty() {
            entity.add_member(text.replace('_', " "));
            has_alias = true;
        }
        for class in mapping_values(alias.attr("verbnet")) {
            entity.push_reference(VERBNET_CLASSES, class);
        }
        for frame in mapping_values(alias.attr("framenet")) {
            entity.push_reference(FRAMENET_FRAMES, frame);
        }
    }
    if !has_alias {
        entity.add_member(lemma.replace('_', " "));
    }

    let mut roles = Vec::new();
    for role in roleset.descendants_named("role") {
        let mut thetas = Vec::new();
        for vnrole in role.children_named("vnrole") {
            for class in mapping_values(vnrole.attr("vncls")) {
                entity.push_reference(VERBNET_CLASSES, class);
            }
            if let Some(theta) = vnrole.attr("vntheta").filter(|t| !t.trim().is_empty()) {
                thetas.push(capitalize(theta.trim()));
            }
        }
        for link in role.descendants_named("rolelink") {
            let resource = link.attr("resource").unwrap_or_default();
            let class = link.attr("class").unwrap_or_default().trim();
            match resource {
                "VerbNet" if !class.is_empty() => {
                    entity.push_reference(VERBNET_CLASSES, class);
                    let theta = link.text_content();
                    if !theta.is_empty() {
                        thetas.push(capitalize(&theta));
                    }
                }
                "FrameNet" if !class.is_empty() => {
                    entity.push_reference(FRAMENET_FRAMES, class);
                }
                _ => {}
            }
        }
        for theta in &thetas {
            entity.annotate(PatternCategory::Role, theta, None);
        }
        roles.push(json!({
            "n": role.attr("n").unwrap_or_default(),
            "f": role.attr("f").unwrap_or_default(),
            "descr": role.attr("descr").unwrap_or_default(),
            "vntheta": thetas,
        }));
    }
    if !roles.is_empty() {
        entity
            .extra
            .insert("roles".to_string(), serde_json::Value::Array(roles));
    }

    for link in roleset.descendants_named("lexlink") {
        let class = link.attr("class").unwrap_or_default();
        match link.attr("resource").unwrap_or_default() {
            "VerbNet" => entity.push_reference(VERBNET_CLASSES, class),
            "FrameNet" => entity.push_reference(FRAMENET_FRAMES, class),
            _ => {}
        }
    }

    let examples: Vec<String> = roleset
        .children_named("example")
        .filter_map(|e| e.child_text("text"))
        .collect();
    if !examples.is_empty() {
        entity.extra.insert("examples".to_string(), json!(examples));
    }

    Ok(entity)
}

/// `agent` → `Agent`, matching the role labels other resources use.
fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl FormatAdapter for PredicateBankAdapter {
    fn name(&self) -> &'static str {
        "predicate-bank-xml"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::PredicateBank
    }

    fn parse_task(&self, task: &ParseTask) -> Result<TaskOutput, ParseError> {
        let content = read_text(&task.primary)?;
        let root = parse_expecting(&content, layout_for(self.kind()).expected_roots)?;
        let source = source_name(&task.primary);
        let mut output = TaskOutput::default();

        for predicate in root.children_named("predicate") {
            let Some(lemma) = predicate.attr("lemma").map(str::trim).filter(|l| !l.is_empty())
            else {
                output.skipped_records += 1;
                continue;
            };
            let mut parent = Entity::new(ResourceKind::PredicateBank, lemma, lemma)
                .with_pos("v")
                .with_source_file(&source)
                .with_members([lemma.replace('_', " ")]);
            if let Some(note) = predicate.child_text("note") {
                parent = parent.with_definition(note);
            }
            output.entities.push(parent);

            for roleset in predicate.children_named("roleset") {
                match parse_roleset(roleset, lemma, &source) {
                    Ok(entity) => {
                        output.edges.push(HierarchyEdge::new(
                            ResourceKind::PredicateBank,
                            lemma,
                            &entity.id,
                        ));
                        output.entities.push(entity);
                    }
                    Err(e) => {
                        tracing::debug!(file = %source, error = %e, "Skipping roleset");
                        output.skipped_records += 1;
                    }
                }
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GIVE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<frameset>
  <predicate lemma="give">
    <roleset id="give.01" name="transfer" vncls="13.1-1">
      <aliases><alias framenet="Giving" pos="v" verbnet="13.1-1">give</alias></aliases>
      <roles>
        <role descr="giver" f="PAG" n="0"><vnrole vncls="13.1-1" vntheta="agent"/></role>
        <role descr="thing given" f="PPT" n="1"><vnrole vncls="13.1-1" vntheta="theme"/></role>
        <role descr="entity given to" f="GOL" n="2">
          <rolelinks><rolelink class="give-13.1-1" resource="VerbNet" version="verbnet3.4">recipient</rolelink></rolelinks>
        </role>
      </roles>
      <example name="give-v: ditransitive"><text>John gave Mary a book.</text></example>
    </roleset>
    <roleset name="no id here"/>
    <roleset id="give.02" name="emit" vncls="-"/>
  </predicate>
</frameset>"#;

    fn parse(content: &str) -> TaskOutput {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("give.xml");
        fs::write(&path, content).unwrap();
        PredicateBankAdapter::new()
            .parse_task(&ParseTask::single(path))
            .unwrap()
    }

    #[test]
    fn test_parse_frameset() {
        let output = parse(GIVE);
        let ids: Vec<_> = output.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["give", "give.01", "give.02"]);
        assert_eq!(output.edges.len(), 2);
        assert_eq!(output.skipped_records, 1);

        let roleset = &output.entities[1];
        assert_eq!(roleset.name, "transfer");
        assert_eq!(roleset.member_lexemes, vec!["give"]);
        assert_eq!(
            roleset.references(VERBNET_CLASSES),
            vec!["13.1-1", "give-13.1-1"]
        );
        assert_eq!(roleset.references(FRAMENET_FRAMES), vec!["Giving"]);
        let roles: Vec<_> = roleset.annotation_names(PatternCategory::Role).collect();
        assert_eq!(roles, vec!["Agent", "Theme", "Recipient"]);
    }

    #[test]
    fn test_dash_mapping_ignored() {
        let output = parse(GIVE);
        let emit = &output.entities[2];
        assert!(emit.references(VERBNET_CLASSES).is_empty());
        assert_eq!(emit.member_lexemes, vec!["give"]);
    }
}
