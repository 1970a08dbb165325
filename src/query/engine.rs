//! Query engine over a published load generation.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use tracing::debug;

use super::types::{
    parse_resources, AttributeMatch, EntitySummary, HierarchyNode, LemmaSearchResult, LogicOp,
    MatchField, SemanticPath, SemanticProfile,
};
use crate::config::{QueryConfig, XrefConfig};
use crate::error::QueryError;
use crate::generation::LoadGeneration;
use crate::model::{normalize_lemma, EntityKey, PatternCategory, RelationRecord, ResourceKind};
use crate::xref::CrossReference;

/// Stateless query engine. Every call takes the generation it reads, so
/// callers holding an older generation keep a consistent view.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    default_max_depth: usize,
    default_min_confidence: f64,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(&QueryConfig::default(), &XrefConfig::default())
    }
}

impl QueryEngine {
    pub fn new(query: &QueryConfig, xref: &XrefConfig) -> Self {
        Self {
            default_max_depth: query.default_max_depth,
            default_min_confidence: xref.default_min_confidence,
        }
    }

    pub fn with_default_min_confidence(mut self, confidence: f64) -> Self {
        self.default_min_confidence = confidence;
        self
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Find entities whose member lexemes or name match the lemmas exactly
    /// (case-normalized).
    pub fn search_lemmas<L: AsRef<str>, R: AsRef<str>>(
        &self,
        generation: &LoadGeneration,
        lemmas: &[L],
        resources: &[R],
        logic: LogicOp,
    ) -> Result<LemmaSearchResult, QueryError> {
        let kinds = parse_resources(resources)?;
        let mut normalized: Vec<String> = Vec::new();
        for lemma in lemmas {
            let lemma = normalize_lemma(lemma.as_ref());
            if !lemma.is_empty() && !normalized.contains(&lemma) {
                normalized.push(lemma);
            }
        }

        let mut result = LemmaSearchResult {
            lemmas: normalized.clone(),
            logic,
            ..Default::default()
        };
        if normalized.is_empty() {
            return Ok(result);
        }

        for kind in kinds {
            let mut by_lemma: BTreeMap<String, Vec<EntitySummary>> = BTreeMap::new();
            for entity in generation.store.entities(kind) {
                let matched: Vec<&String> =
                    normalized.iter().filter(|l| entity.matches_lemma(l)).collect();
                let accept = match logic {
                    LogicOp::And => matched.len() == normalized.len(),
                    LogicOp::Or => !matched.is_empty(),
                };
                if !accept {
                    continue;
                }
                for lemma in matched {
                    by_lemma
                        .entry(lemma.clone())
                        .or_default()
                        .push(EntitySummary::from(entity));
                }
            }
            if !by_lemma.is_empty() {
                result.matches.insert(kind, by_lemma);
            }
        }

        debug!(
            lemmas = ?result.lemmas,
            logic = %logic,
            resources = result.matches.len(),
            "Lemma search"
        );
        Ok(result)
    }

    /// Entities declaring an annotation of `pattern_type` named exactly `value`.
    pub fn search_by_pattern<R: AsRef<str>>(
        &self,
        generation: &LoadGeneration,
        pattern_type: &str,
        value: &str,
        resources: &[R],
    ) -> Result<BTreeMap<ResourceKind, Vec<EntitySummary>>, QueryError> {
        let category: PatternCategory = pattern_type.parse()?;
        let kinds = parse_resources(resources)?;
        let mut matches = BTreeMap::new();
        for kind in kinds {
            let found: Vec<EntitySummary> = generation
                .store
                .entities(kind)
                .iter()
                .filter(|e| e.annotation_names(category).any(|n| n == value))
                .map(EntitySummary::from)
                .collect();
            if !found.is_empty() {
                matches.insert(kind, found);
            }
        }
        Ok(matches)
    }

    /// Rank entries of one vocabulary against a free-text query.
    ///
    /// Exact matches are always considered; substring matches only when
    /// `fuzzy` is set. Comparison ignores case.
    pub fn search_by_attribute(
        &self,
        generation: &LoadGeneration,
        collection_name: &str,
        query: &str,
        fuzzy: bool,
    ) -> Result<Vec<AttributeMatch>, QueryError> {
        let entries = generation.collection.collection(collection_name)?;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<AttributeMatch> = entries
            .iter()
            .filter_map(|entry| {
                let name = entry.name.to_lowercase();
                let definition = entry.definition.as_deref().map(str::to_lowercase);
                let (score, matched_on) = if name == needle {
                    (100, MatchField::Name)
                } else if definition.as_deref() == Some(needle.as_str()) {
                    (90, MatchField::Definition)
                } else if fuzzy && name.contains(&needle) {
                    (75, MatchField::Name)
                } else if fuzzy
                    && definition
                        .as_deref()
                        .is_some_and(|d| d.contains(needle.as_str()))
                {
                    (60, MatchField::Definition)
                } else {
                    return None;
                };
                Some(AttributeMatch {
                    entry: entry.clone(),
                    score,
                    matched_on,
                })
            })
            .collect();
        matches.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(matches)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Subtree rooted at `id`, at most `max_depth` levels below it.
    ///
    /// Returns `Ok(None)` for an unknown id. Each node is expanded once, so
    /// cyclic input still terminates.
    pub fn hierarchy(
        &self,
        generation: &LoadGeneration,
        resource: &str,
        id: &str,
        max_depth: Option<usize>,
    ) -> Result<Option<HierarchyNode>, QueryError> {
        let kind: ResourceKind = resource.parse()?;
        if !generation.store.contains(kind, id) {
            return Ok(None);
        }
        let max_depth = max_depth.unwrap_or(self.default_max_depth);
        let mut visited = HashSet::new();
        Ok(Some(build_node(generation, kind, id, 0, max_depth, &mut visited)))
    }

    pub fn parent(
        &self,
        generation: &LoadGeneration,
        resource: &str,
        id: &str,
    ) -> Result<Option<String>, QueryError> {
        let kind: ResourceKind = resource.parse()?;
        Ok(generation.store.parent(kind, id).map(str::to_string))
    }

    /// Typed relations (such as frame-to-frame relations) naming `id`.
    pub fn relations(
        &self,
        generation: &LoadGeneration,
        resource: &str,
        id: &str,
    ) -> Result<Vec<RelationRecord>, QueryError> {
        let kind: ResourceKind = resource.parse()?;
        Ok(generation
            .store
            .relations_of(kind, id)
            .into_iter()
            .cloned()
            .collect())
    }

    // ========================================================================
    // Cross References
    // ========================================================================

    /// Links between `id` and entities of `target`, in both directions.
    ///
    /// Incoming links are flipped so `id` is always the source. Results are
    /// sorted by confidence, explicit links first at equal confidence.
    pub fn cross_reference(
        &self,
        generation: &LoadGeneration,
        source: &str,
        id: &str,
        target: &str,
        min_confidence: Option<f64>,
    ) -> Result<Vec<CrossReference>, QueryError> {
        let source_kind: ResourceKind = source.parse()?;
        let target_kind: ResourceKind = target.parse()?;
        let min_confidence = min_confidence.unwrap_or(self.default_min_confidence);
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(QueryError::InvalidConfidence(min_confidence));
        }

        let outgoing = generation
            .xref
            .links_from(source_kind, id)
            .into_iter()
            .filter(|l| l.target.kind == target_kind)
            .cloned();
        let incoming = generation
            .xref
            .links_to(source_kind, id)
            .into_iter()
            .filter(|l| l.source.kind == target_kind)
            .map(CrossReference::flipped);

        let mut links: Vec<CrossReference> = outgoing
            .chain(incoming)
            .filter(|l| l.confidence >= min_confidence)
            .collect();
        links.sort_by(CrossReference::confidence_order);
        Ok(links)
    }

    /// Base forms for an inflected word, or the word itself.
    pub fn base_forms(&self, generation: &LoadGeneration, word: &str) -> Vec<String> {
        match generation.exceptions_for(word) {
            Some(bases) => bases.to_vec(),
            None => {
                let word = normalize_lemma(word);
                if word.is_empty() {
                    Vec::new()
                } else {
                    vec![word]
                }
            }
        }
    }

    /// Every entity matching the lemma (or its base forms) in any resource,
    /// with their cross references.
    pub fn semantic_profile(&self, generation: &LoadGeneration, lemma: &str) -> SemanticProfile {
        let normalized = normalize_lemma(lemma);
        let base_forms = self.base_forms(generation, lemma);
        let mut forms = vec![normalized.clone()];
        forms.extend(base_forms.iter().filter(|b| **b != normalized).cloned());

        let mut entities: BTreeMap<ResourceKind, Vec<EntitySummary>> = BTreeMap::new();
        let mut cross_references = Vec::new();
        let mut seen = HashSet::new();

        for entity in generation.store.iter() {
            if !forms.iter().any(|f| !f.is_empty() && entity.matches_lemma(f)) {
                continue;
            }
            entities
                .entry(entity.kind)
                .or_default()
                .push(EntitySummary::from(entity));

            let outgoing = generation.xref.links_from(entity.kind, &entity.id);
            let incoming = generation.xref.links_to(entity.kind, &entity.id);
            for link in outgoing
                .into_iter()
                .cloned()
                .chain(incoming.into_iter().map(CrossReference::flipped))
            {
                let (a, b) = if link.source <= link.target {
                    (link.source.clone(), link.target.clone())
                } else {
                    (link.target.clone(), link.source.clone())
                };
                if seen.insert((a, b, link.kind, link.via.clone())) {
                    cross_references.push(link);
                }
            }
        }
        cross_references.sort_by(CrossReference::confidence_order);

        SemanticProfile {
            lemma: normalized,
            base_forms,
            entities,
            cross_references,
        }
    }

    /// Shortest chain of resolved cross references from `from` to `to`,
    /// following links in both directions.
    pub fn trace_path(
        &self,
        generation: &LoadGeneration,
        from: &EntityKey,
        to: &EntityKey,
        max_depth: Option<usize>,
    ) -> Option<SemanticPath> {
        if generation.store.get_key(from).is_none() || generation.store.get_key(to).is_none() {
            return None;
        }
        if from == to {
            return Some(SemanticPath {
                nodes: vec![from.clone()],
                links: Vec::new(),
            });
        }
        let max_depth = max_depth.unwrap_or(self.default_max_depth);

        let mut came_from: HashMap<EntityKey, CrossReference> = HashMap::new();
        let mut depth: HashMap<EntityKey, usize> = HashMap::from([(from.clone(), 0)]);
        let mut queue = VecDeque::from([from.clone()]);

        while let Some(current) = queue.pop_front() {
            let d = depth.get(&current).copied().unwrap_or(0);
            if d >= max_depth {
                continue;
            }
            let outgoing = generation.xref.links_from(current.kind, &current.id);
            let incoming = generation.xref.links_to(current.kind, &current.id);
            let steps = outgoing
                .into_iter()
                .filter(|l| !l.unresolved)
                .cloned()
                .chain(incoming.into_iter().map(CrossReference::flipped));

            for link in steps {
                if depth.contains_key(&link.target) {
                    continue;
                }
                depth.insert(link.target.clone(), d + 1);
                let reached = link.target == *to;
                queue.push_back(link.target.clone());
                came_from.insert(link.target.clone(), link);
                if reached {
                    return Some(unwind(from, to, &came_from));
                }
            }
        }
        None
    }
}

fn build_node(
    generation: &LoadGeneration,
    kind: ResourceKind,
    id: &str,
    depth: usize,
    max_depth: usize,
    visited: &mut HashSet<String>,
) -> HierarchyNode {
    visited.insert(id.to_string());
    let name = generation
        .store
        .get(kind, id)
        .map(|e| e.name.clone())
        .unwrap_or_else(|| id.to_string());
    let child_ids = generation.store.children(kind, id);

    let mut node = HierarchyNode {
        id: id.to_string(),
        name,
        depth,
        children: Vec::new(),
        truncated: false,
    };
    if depth >= max_depth {
        node.truncated = !child_ids.is_empty();
        return node;
    }
    for child in child_ids {
        if visited.contains(child) {
            continue;
        }
        node.children
            .push(build_node(generation, kind, child, depth + 1, max_depth, visited));
    }
    node
}

fn unwind(
    from: &EntityKey,
    to: &EntityKey,
    came_from: &HashMap<EntityKey, CrossReference>,
) -> SemanticPath {
    let mut links = Vec::new();
    let mut current = to.clone();
    while current != *from {
        match came_from.get(&current) {
            Some(link) => {
                current = link.source.clone();
                links.push(link.clone());
            }
            None => break,
        }
    }
    links.reverse();
    let mut nodes = vec![from.clone()];
    nodes.extend(links.iter().map(|l| l.target.clone()));
    SemanticPath { nodes, links }
}
