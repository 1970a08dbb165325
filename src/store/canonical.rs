use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::model::{
    normalize_reference_key, Entity, EntityKey, HierarchyEdge, RelationRecord, ResourceKind,
};

/// Non-fatal conditions recorded while filling the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreWarning {
    /// A second entity with the same key replaced the first.
    DuplicateEntity { key: EntityKey },
    /// An edge would have given a child a second parent and was dropped.
    MultipleParents {
        kind: ResourceKind,
        child_id: String,
        existing_parent: String,
        rejected_parent: String,
    },
}

impl StoreWarning {
    /// Resource the warning belongs to.
    pub fn kind(&self) -> ResourceKind {
        match self {
            StoreWarning::DuplicateEntity { key } => key.kind,
            StoreWarning::MultipleParents { kind, .. } => *kind,
        }
    }
}

/// Per-kind storage.
#[derive(Debug, Clone, Default)]
struct KindTable {
    entities: Vec<Entity>,
    /// id -> position in `entities`
    index: HashMap<String, usize>,
    /// alias -> position in `entities`; the first entity claiming an alias keeps it
    aliases: HashMap<String, usize>,
    parent: HashMap<String, String>,
    children: HashMap<String, Vec<String>>,
    edges: Vec<HierarchyEdge>,
    relations: Vec<RelationRecord>,
}

impl KindTable {
    fn insert(&mut self, entity: Entity) -> bool {
        match self.index.get(&entity.id).copied() {
            Some(pos) => {
                let previous = std::mem::replace(&mut self.entities[pos], entity);
                self.aliases
                    .retain(|alias, p| *p != pos || !previous.aliases.contains(alias));
                self.index_aliases(pos);
                true
            }
            None => {
                let pos = self.entities.len();
                self.index.insert(entity.id.clone(), pos);
                self.entities.push(entity);
                self.index_aliases(pos);
                false
            }
        }
    }

    fn index_aliases(&mut self, pos: usize) {
        for alias in &self.entities[pos].aliases {
            self.aliases.entry(alias.clone()).or_insert(pos);
        }
    }
}

/// The canonical store: every entity of a load, keyed by `(kind, id)`.
#[derive(Debug, Clone, Default)]
pub struct CanonicalStore {
    tables: BTreeMap<ResourceKind, KindTable>,
    warnings: Vec<StoreWarning>,
}

impl CanonicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Insert entities and fold hierarchy edges into the parent/children index.
    ///
    /// A duplicate key overwrites the earlier entity in place and records
    /// [`StoreWarning::DuplicateEntity`]. An edge giving a child a second
    /// parent is rejected with [`StoreWarning::MultipleParents`]; repeating an
    /// existing edge is a no-op.
    pub fn put(&mut self, entities: Vec<Entity>, edges: Vec<HierarchyEdge>) {
        for entity in entities {
            let key = entity.key();
            let table = self.tables.entry(entity.kind).or_default();
            if table.insert(entity) {
                warn!(entity = %key, "Duplicate entity key, keeping the later definition");
                self.warnings.push(StoreWarning::DuplicateEntity { key });
            }
        }

        for edge in edges {
            self.put_edge(edge);
        }
    }

    fn put_edge(&mut self, edge: HierarchyEdge) {
        let table = self.tables.entry(edge.kind).or_default();
        if let Some(existing) = table.parent.get(&edge.child_id) {
            if *existing != edge.parent_id {
                warn!(
                    resource = %edge.kind,
                    child = %edge.child_id,
                    existing = %existing,
                    rejected = %edge.parent_id,
                    "Rejecting second parent"
                );
                self.warnings.push(StoreWarning::MultipleParents {
                    kind: edge.kind,
                    child_id: edge.child_id,
                    existing_parent: existing.clone(),
                    rejected_parent: edge.parent_id,
                });
            }
            return;
        }
        table
            .parent
            .insert(edge.child_id.clone(), edge.parent_id.clone());
        table
            .children
            .entry(edge.parent_id.clone())
            .or_default()
            .push(edge.child_id.clone());
        table.edges.push(edge);
    }

    /// Append typed intra-resource relations.
    pub fn put_relations(&mut self, relations: Vec<RelationRecord>) {
        for relation in relations {
            debug!(
                resource = %relation.kind,
                relation = %relation.relation,
                super_id = %relation.super_id,
                sub_id = %relation.sub_id,
                "Recording relation"
            );
            self.tables
                .entry(relation.kind)
                .or_default()
                .relations
                .push(relation);
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn get(&self, kind: ResourceKind, id: &str) -> Option<&Entity> {
        let table = self.tables.get(&kind)?;
        table.index.get(id).map(|&pos| &table.entities[pos])
    }

    pub fn get_key(&self, key: &EntityKey) -> Option<&Entity> {
        self.get(key.kind, &key.id)
    }

    pub fn contains(&self, kind: ResourceKind, id: &str) -> bool {
        self.get(kind, id).is_some()
    }

    /// Resolve a verbatim reference key to an entity id of `kind`.
    ///
    /// The key is normalized first, then matched against ids and then
    /// aliases, both exactly.
    pub fn resolve_alias(&self, kind: ResourceKind, key: &str) -> Option<&str> {
        let table = self.tables.get(&kind)?;
        let key = normalize_reference_key(key);
        if key.is_empty() {
            return None;
        }
        table
            .index
            .get(key.as_str())
            .or_else(|| table.aliases.get(key.as_str()))
            .map(|&pos| table.entities[pos].id.as_str())
    }

    /// Entities of one kind in insertion order.
    pub fn entities(&self, kind: ResourceKind) -> &[Entity] {
        self.tables
            .get(&kind)
            .map(|t| t.entities.as_slice())
            .unwrap_or(&[])
    }

    /// All entities, kinds in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.tables.values().flat_map(|t| t.entities.iter())
    }

    pub fn len(&self, kind: ResourceKind) -> usize {
        self.tables.get(&kind).map_or(0, |t| t.entities.len())
    }

    pub fn total_len(&self) -> usize {
        self.tables.values().map(|t| t.entities.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Kinds holding at least one entity.
    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.tables
            .iter()
            .filter(|(_, t)| !t.entities.is_empty())
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn warnings(&self) -> &[StoreWarning] {
        &self.warnings
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Direct children ids in edge insertion order.
    pub fn children(&self, kind: ResourceKind, id: &str) -> &[String] {
        self.tables
            .get(&kind)
            .and_then(|t| t.children.get(id))
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, kind: ResourceKind, id: &str) -> Option<&str> {
        self.tables
            .get(&kind)
            .and_then(|t| t.parent.get(id))
            .map(String::as_str)
    }

    /// Walk parent links up to the root.
    ///
    /// Returns `Ok(None)` for an unknown id and the id itself for a root.
    /// The walk is bounded by the entity count of the kind; exceeding it
    /// means the parent chain loops.
    pub fn top_level_ancestor(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<String>, StoreError> {
        if !self.contains(kind, id) {
            return Ok(None);
        }
        let limit = self.len(kind);
        let mut current = id;
        let mut steps = 0usize;
        while let Some(parent) = self.parent(kind, current) {
            steps += 1;
            if steps > limit {
                return Err(StoreError::CycleDetected {
                    kind: kind.to_string(),
                    id: id.to_string(),
                });
            }
            current = parent;
        }
        Ok(Some(current.to_string()))
    }

    /// Accepted hierarchy edges of one kind, in insertion order.
    pub fn edges(&self, kind: ResourceKind) -> &[HierarchyEdge] {
        self.tables
            .get(&kind)
            .map(|t| t.edges.as_slice())
            .unwrap_or(&[])
    }

    pub fn edge_count(&self, kind: ResourceKind) -> usize {
        self.edges(kind).len()
    }

    /// Ids appearing as a parent or child in the hierarchy of `kind`.
    pub fn hierarchy_nodes(&self, kind: ResourceKind) -> Vec<&str> {
        let Some(table) = self.tables.get(&kind) else {
            return Vec::new();
        };
        let mut nodes: Vec<&str> = table
            .edges
            .iter()
            .flat_map(|e| [e.parent_id.as_str(), e.child_id.as_str()])
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    // ========================================================================
    // Relations
    // ========================================================================

    pub fn relations(&self, kind: ResourceKind) -> &[RelationRecord] {
        self.tables
            .get(&kind)
            .map(|t| t.relations.as_slice())
            .unwrap_or(&[])
    }

    /// Relations naming `id` on either side.
    pub fn relations_of(&self, kind: ResourceKind, id: &str) -> Vec<&RelationRecord> {
        self.relations(kind)
            .iter()
            .filter(|r| r.super_id == id || r.sub_id == id)
            .collect()
    }
}
