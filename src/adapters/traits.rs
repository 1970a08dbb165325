//! Adapter trait definitions and common types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::model::{Entity, HierarchyEdge, ParseStats, RelationRecord, ResourceKind};

/// One unit of parse work: a file, optionally with side files it needs
/// (such as the index that accompanies a synset data file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTask {
    pub primary: PathBuf,
    pub side: Vec<PathBuf>,
}

impl ParseTask {
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            primary: path.into(),
            side: Vec::new(),
        }
    }

    pub fn with_side(mut self, path: impl Into<PathBuf>) -> Self {
        self.side.push(path.into());
        self
    }

    /// Display label used in stats and logs.
    pub fn label(&self) -> String {
        self.primary.display().to_string()
    }
}

/// Everything one task produced.
#[derive(Debug, Clone, Default)]
pub struct TaskOutput {
    pub entities: Vec<Entity>,
    pub edges: Vec<HierarchyEdge>,
    pub relations: Vec<RelationRecord>,
    /// Inflected form to base form pairs.
    pub exceptions: Vec<(String, String)>,
    /// Records inside the file that were skipped as unreadable.
    pub skipped_records: usize,
}

/// Merged output of every task of one resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterOutput {
    pub entities: Vec<Entity>,
    pub edges: Vec<HierarchyEdge>,
    #[serde(default)]
    pub relations: Vec<RelationRecord>,
    #[serde(default)]
    pub exceptions: Vec<(String, String)>,
    pub stats: ParseStats,
}

impl AdapterOutput {
    /// Fold one task result into the resource output, in task order.
    ///
    /// A failed task is recorded on the stats and otherwise ignored.
    pub fn absorb(&mut self, task: &ParseTask, result: Result<TaskOutput, ParseError>) {
        match result {
            Ok(output) => {
                debug!(
                    file = %task.label(),
                    entities = output.entities.len(),
                    skipped = output.skipped_records,
                    "Parsed file"
                );
                self.stats.record_success();
                self.stats.skipped_records += output.skipped_records;
                self.entities.extend(output.entities);
                self.edges.extend(output.edges);
                self.relations.extend(output.relations);
                self.exceptions.extend(output.exceptions);
            }
            Err(e) => {
                warn!(file = %task.label(), error = %e, "Failed to parse file");
                self.stats.record_failure(task.label(), e.to_string());
            }
        }
    }
}

/// Trait for resource format adapters.
///
/// Adapters are synchronous and share no state between tasks, so the loader
/// can run tasks on blocking worker threads in parallel.
pub trait FormatAdapter: Send + Sync {
    /// Adapter name for logging.
    fn name(&self) -> &'static str;

    /// Resource kind produced by this adapter.
    fn kind(&self) -> ResourceKind;

    /// Group already-filtered files into independent tasks.
    fn plan(&self, files: &[PathBuf]) -> Vec<ParseTask> {
        files.iter().map(|path| ParseTask::single(path.clone())).collect()
    }

    /// Parse one task.
    fn parse_task(&self, task: &ParseTask) -> Result<TaskOutput, ParseError>;

    /// Post-process the merged output of every task of the resource.
    ///
    /// Runs once, after all tasks were absorbed in task order.
    fn finish(&self, _output: &mut AdapterOutput) {}

    /// Parse every file sequentially.
    fn parse(&self, files: &[PathBuf]) -> AdapterOutput {
        let mut output = AdapterOutput::default();
        for task in self.plan(files) {
            let result = self.parse_task(&task);
            output.absorb(&task, result);
        }
        self.finish(&mut output);
        output
    }
}

/// Read a file as UTF-8 text, dropping a leading byte order mark.
pub fn read_text(path: &Path) -> Result<String, ParseError> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ParseError::Encoding(format!("{}: {}", path.display(), e)))?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// File name as a string, for entity provenance.
pub fn source_name(path: &Path) -> String {
    path.display().to_string()
}

/// File stem, used for categories derived from file names.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
