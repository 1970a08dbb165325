use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::rules::{required_fields, RequiredField};
use crate::model::ResourceKind;
use crate::store::{CanonicalStore, StoreWarning};
use crate::xref::CrossReferenceIndex;

/// An entity lacking a required field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingField {
    pub id: String,
    pub field: String,
}

/// An explicit reference whose target was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedReference {
    pub source_id: String,
    pub target_kind: ResourceKind,
    pub key: String,
    pub via: String,
}

/// A hierarchy edge rejected because the child already had a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentConflict {
    pub child_id: String,
    pub existing_parent: String,
    pub rejected_parent: String,
}

/// Findings for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceValidation {
    pub entity_count: usize,
    pub missing_required_fields: Vec<MissingField>,
    /// Each cycle as the ids on it, starting from the smallest id.
    pub hierarchy_cycles: Vec<Vec<String>>,
    pub unresolved_references: Vec<UnresolvedReference>,
    pub multiple_parents: Vec<ParentConflict>,
    /// Ids stored more than once; the later record replaced the earlier.
    #[serde(default)]
    pub duplicate_entities: Vec<String>,
}

impl ResourceValidation {
    pub fn issue_count(&self) -> usize {
        self.missing_required_fields.len()
            + self.hierarchy_cycles.len()
            + self.unresolved_references.len()
            + self.multiple_parents.len()
            + self.duplicate_entities.len()
    }
}

/// Validation findings for every loaded resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub per_resource: BTreeMap<ResourceKind, ResourceValidation>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }

    pub fn issue_count(&self) -> usize {
        self.per_resource.values().map(|r| r.issue_count()).sum()
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceValidation> {
        self.per_resource.get(&kind)
    }
}

/// Runs the per-kind checks.
#[derive(Debug, Clone)]
pub struct Validator {
    rules: BTreeMap<ResourceKind, Vec<RequiredField>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Validator using the default rule table.
    pub fn new() -> Self {
        let rules = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, required_fields(kind).to_vec()))
            .collect();
        Self { rules }
    }

    /// Replace the required fields of one kind.
    pub fn with_rule(mut self, kind: ResourceKind, fields: Vec<RequiredField>) -> Self {
        self.rules.insert(kind, fields);
        self
    }

    /// Validate every kind present in the store.
    pub fn validate(&self, store: &CanonicalStore, index: &CrossReferenceIndex) -> ValidationReport {
        let mut per_resource = BTreeMap::new();
        for kind in store.kinds() {
            per_resource.insert(kind, self.validate_kind(store, index, kind));
        }

        for warning in store.warnings() {
            let findings = per_resource.entry(warning.kind()).or_default();
            match warning {
                StoreWarning::MultipleParents {
                    child_id,
                    existing_parent,
                    rejected_parent,
                    ..
                } => findings.multiple_parents.push(ParentConflict {
                    child_id: child_id.clone(),
                    existing_parent: existing_parent.clone(),
                    rejected_parent: rejected_parent.clone(),
                }),
                StoreWarning::DuplicateEntity { key } => {
                    if !findings.duplicate_entities.contains(&key.id) {
                        findings.duplicate_entities.push(key.id.clone());
                    }
                }
            }
        }

        let report = ValidationReport { per_resource };
        info!(
            resources = report.per_resource.len(),
            issues = report.issue_count(),
            "Validation complete"
        );
        report
    }

    fn validate_kind(
        &self,
        store: &CanonicalStore,
        index: &CrossReferenceIndex,
        kind: ResourceKind,
    ) -> ResourceValidation {
        let rules = self.rules.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        let mut result = ResourceValidation {
            entity_count: store.len(kind),
            ..Default::default()
        };

        for entity in store.entities(kind) {
            for rule in rules.iter().filter(|r| !r.is_present(entity)) {
                result.missing_required_fields.push(MissingField {
                    id: entity.id.clone(),
                    field: rule.to_string(),
                });
            }
        }

        result.hierarchy_cycles = find_cycles(store, kind);
        for cycle in &result.hierarchy_cycles {
            warn!(resource = %kind, nodes = ?cycle, "Hierarchy cycle");
        }

        result.unresolved_references = index
            .unresolved_from(kind)
            .map(|link| UnresolvedReference {
                source_id: link.source.id.clone(),
                target_kind: link.target.kind,
                key: link.target.id.clone(),
                via: link.via.clone(),
            })
            .collect();

        result
    }
}

/// Validate with the default rule table.
pub fn validate(store: &CanonicalStore, index: &CrossReferenceIndex) -> ValidationReport {
    Validator::new().validate(store, index)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

/// Depth-first search over the children index, tracking the active path.
fn find_cycles(store: &CanonicalStore, kind: ResourceKind) -> Vec<Vec<String>> {
    let mut state: HashMap<&str, Visit> = HashMap::new();
    let mut cycles = Vec::new();

    for start in store.hierarchy_nodes(kind) {
        if state.contains_key(start) {
            continue;
        }
        state.insert(start, Visit::Active);
        let mut path: Vec<&str> = vec![start];
        let mut cursors: Vec<usize> = vec![0];

        while let Some(&node) = path.last() {
            let depth = path.len() - 1;
            let children = store.children(kind, node);
            let next = cursors[depth];
            if next >= children.len() {
                state.insert(node, Visit::Done);
                path.pop();
                cursors.pop();
                continue;
            }
            cursors[depth] += 1;

            let child = children[next].as_str();
            match state.get(child) {
                None => {
                    state.insert(child, Visit::Active);
                    path.push(child);
                    cursors.push(0);
                }
                Some(Visit::Active) => {
                    if let Some(from) = path.iter().position(|n| *n == child) {
                        cycles.push(canonical_cycle(&path[from..]));
                    }
                }
                Some(Visit::Done) => {}
            }
        }
    }
    cycles.sort();
    cycles
}

/// Rotate so the smallest id comes first.
fn canonical_cycle(nodes: &[&str]) -> Vec<String> {
    let start = nodes
        .iter()
        .enumerate()
        .min_by_key(|(_, n)| **n)
        .map_or(0, |(i, _)| i);
    nodes[start..]
        .iter()
        .chain(&nodes[..start])
        .map(|n| n.to_string())
        .collect()
}
