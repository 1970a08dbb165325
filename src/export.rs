//! Snapshot export (JSON, XML, CSV) and JSON snapshot import.
//!
//! Exports are pure serialization of a generation: requested entities,
//! their hierarchy edges, their outgoing cross references and collection
//! sizes.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExportError, Result};
use crate::generation::{GenerationId, LoadGeneration};
use crate::model::{Entity, EntityKey, HierarchyEdge, ResourceKind};
use crate::query::types::parse_resources;
use crate::store::CanonicalStore;
use crate::xref::CrossReference;

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Output format of [`export_snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Xml,
    Csv,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Xml => f.write_str("xml"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub version: u32,
    pub generation: GenerationId,
    pub exported_at: DateTime<Utc>,
    pub resources: Vec<ResourceKind>,
    pub entity_count: usize,
}

/// Serialized view of (part of) a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub entities: BTreeMap<ResourceKind, Vec<Entity>>,
    #[serde(default)]
    pub hierarchy: BTreeMap<ResourceKind, Vec<HierarchyEdge>>,
    #[serde(default)]
    pub cross_references: Vec<CrossReference>,
    /// Entry count per vocabulary.
    #[serde(default)]
    pub collections: BTreeMap<String, usize>,
}

impl Snapshot {
    /// Capture the requested kinds of a generation.
    pub fn capture(generation: &LoadGeneration, kinds: &[ResourceKind]) -> Self {
        let mut entities = BTreeMap::new();
        let mut hierarchy = BTreeMap::new();
        let mut cross_references = Vec::new();

        for &kind in kinds {
            let list = generation.store.entities(kind);
            if list.is_empty() {
                continue;
            }
            entities.insert(kind, list.to_vec());
            let edges = generation.store.edges(kind);
            if !edges.is_empty() {
                hierarchy.insert(kind, edges.to_vec());
            }
            for entity in list {
                cross_references.extend(
                    generation
                        .xref
                        .links_from(kind, &entity.id)
                        .into_iter()
                        .cloned(),
                );
            }
        }

        let entity_count = entities.values().map(Vec::len).sum();
        Self {
            metadata: SnapshotMetadata {
                version: SNAPSHOT_VERSION,
                generation: generation.id,
                exported_at: Utc::now(),
                resources: kinds.to_vec(),
                entity_count,
            },
            entities,
            hierarchy,
            cross_references,
            collections: generation.collection.sizes(),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }

    /// Source/target pairs of the resolved links.
    pub fn resolved_links(&self) -> HashSet<(EntityKey, EntityKey)> {
        self.cross_references
            .iter()
            .filter(|l| !l.unresolved)
            .map(|l| (l.source.clone(), l.target.clone()))
            .collect()
    }

    /// Rebuild a canonical store from the snapshot contents.
    pub fn into_store(self) -> CanonicalStore {
        let mut store = CanonicalStore::new();
        for (kind, entities) in self.entities {
            let edges = self.hierarchy.get(&kind).cloned().unwrap_or_default();
            store.put(entities, edges);
        }
        store
    }
}

/// Serialize the requested resources of a generation.
///
/// An empty resource list exports every kind.
pub fn export_snapshot<S: AsRef<str>>(
    generation: &LoadGeneration,
    resources: &[S],
    format: ExportFormat,
) -> Result<Vec<u8>> {
    let kinds = parse_resources(resources)?;
    let snapshot = Snapshot::capture(generation, &kinds);
    let bytes = match format {
        ExportFormat::Json => serde_json::to_vec_pretty(&snapshot)?,
        ExportFormat::Xml => to_xml(&snapshot)?,
        ExportFormat::Csv => to_csv(&snapshot).into_bytes(),
    };
    info!(
        format = %format,
        entities = snapshot.entity_count(),
        links = snapshot.cross_references.len(),
        bytes = bytes.len(),
        "Exported snapshot"
    );
    Ok(bytes)
}

/// Parse a JSON snapshot produced by [`export_snapshot`].
pub fn import_json_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    let snapshot: Snapshot = serde_json::from_slice(bytes)
        .map_err(|e| ExportError::InvalidSnapshot(e.to_string()))?;
    if snapshot.metadata.version != SNAPSHOT_VERSION {
        return Err(ExportError::InvalidSnapshot(format!(
            "unsupported snapshot version {}",
            snapshot.metadata.version
        ))
        .into());
    }
    Ok(snapshot)
}

// ============================================================================
// XML
// ============================================================================

fn write_error(e: impl fmt::Display) -> ExportError {
    ExportError::Write(e.to_string())
}

fn to_xml(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut emit = |event: Event<'_>| writer.write_event(event).map_err(write_error);

    emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let generation = snapshot.metadata.generation.to_string();
    let exported_at = snapshot.metadata.exported_at.to_rfc3339();
    let mut root = BytesStart::new("snapshot");
    root.push_attribute(("version", SNAPSHOT_VERSION.to_string().as_str()));
    root.push_attribute(("generation", generation.as_str()));
    root.push_attribute(("exported_at", exported_at.as_str()));
    emit(Event::Start(root))?;

    for (kind, entities) in &snapshot.entities {
        let count = entities.len().to_string();
        let mut resource = BytesStart::new("resource");
        resource.push_attribute(("kind", kind.as_str()));
        resource.push_attribute(("count", count.as_str()));
        emit(Event::Start(resource))?;

        for entity in entities {
            let mut start = BytesStart::new("entity");
            start.push_attribute(("id", entity.id.as_str()));
            start.push_attribute(("name", entity.name.as_str()));
            if let Some(pos) = &entity.pos {
                start.push_attribute(("pos", pos.as_str()));
            }
            emit(Event::Start(start))?;

            if let Some(definition) = &entity.definition {
                text_element(&mut emit, BytesStart::new("definition"), definition)?;
            }
            for member in &entity.member_lexemes {
                text_element(&mut emit, BytesStart::new("member"), member)?;
            }
            for alias in &entity.aliases {
                text_element(&mut emit, BytesStart::new("alias"), alias)?;
            }
            for annotation in &entity.annotations {
                let mut start = BytesStart::new("annotation");
                start.push_attribute(("category", annotation.category.as_str()));
                start.push_attribute(("name", annotation.name.as_str()));
                match &annotation.definition {
                    Some(definition) => text_element(&mut emit, start, definition)?,
                    None => emit(Event::Empty(start))?,
                }
            }
            for (key, value) in &entity.extra {
                let mut start = BytesStart::new("extra");
                start.push_attribute(("key", key.as_str()));
                text_element(&mut emit, start, &value.to_string())?;
            }
            emit(Event::End(BytesEnd::new("entity")))?;
        }
        emit(Event::End(BytesEnd::new("resource")))?;
    }

    emit(Event::Start(BytesStart::new("cross_references")))?;
    for link in &snapshot.cross_references {
        let confidence = format!("{:.4}", link.confidence);
        let mut start = BytesStart::new("link");
        start.push_attribute(("source_kind", link.source.kind.as_str()));
        start.push_attribute(("source_id", link.source.id.as_str()));
        start.push_attribute(("target_kind", link.target.kind.as_str()));
        start.push_attribute(("target_id", link.target.id.as_str()));
        start.push_attribute(("kind", link.kind.as_str()));
        start.push_attribute(("confidence", confidence.as_str()));
        start.push_attribute(("via", link.via.as_str()));
        if link.unresolved {
            start.push_attribute(("unresolved", "true"));
        }
        emit(Event::Empty(start))?;
    }
    emit(Event::End(BytesEnd::new("cross_references")))?;

    emit(Event::Start(BytesStart::new("collections")))?;
    for (name, size) in &snapshot.collections {
        let size = size.to_string();
        let mut start = BytesStart::new("collection");
        start.push_attribute(("name", name.as_str()));
        start.push_attribute(("size", size.as_str()));
        emit(Event::Empty(start))?;
    }
    emit(Event::End(BytesEnd::new("collections")))?;

    emit(Event::End(BytesEnd::new("snapshot")))?;
    drop(emit);
    Ok(writer.into_inner())
}

fn text_element<F>(emit: &mut F, start: BytesStart<'_>, text: &str) -> Result<()>
where
    F: FnMut(Event<'_>) -> std::result::Result<(), ExportError>,
{
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    emit(Event::Start(start))?;
    emit(Event::Text(BytesText::new(text)))?;
    emit(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

// ============================================================================
// CSV
// ============================================================================

const CSV_HEADER: &[&str] = &[
    "kind",
    "id",
    "name",
    "pos",
    "definition",
    "member_lexemes",
    "aliases",
    "parent",
    "cross_references",
];

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn to_csv(snapshot: &Snapshot) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');

    for (kind, entities) in &snapshot.entities {
        let parents: BTreeMap<&str, &str> = snapshot
            .hierarchy
            .get(kind)
            .into_iter()
            .flatten()
            .map(|e| (e.child_id.as_str(), e.parent_id.as_str()))
            .collect();

        for entity in entities {
            let links: Vec<String> = snapshot
                .cross_references
                .iter()
                .filter(|l| !l.unresolved && l.source == entity.key())
                .map(|l| l.target.to_string())
                .collect();
            let row = [
                kind.as_str().to_string(),
                entity.id.clone(),
                entity.name.clone(),
                entity.pos.clone().unwrap_or_default(),
                entity.definition.clone().unwrap_or_default(),
                entity.member_lexemes.join(";"),
                entity.aliases.join(";"),
                parents.get(entity.id.as_str()).map(|p| p.to_string()).unwrap_or_default(),
                links.join(";"),
            ];
            let cells: Vec<String> = row.iter().map(|c| csv_cell(c)).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
    }
    out
}
