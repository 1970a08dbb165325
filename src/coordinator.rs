//! Knowledge base coordinator that orchestrates the full load pipeline.
//!
//! The coordinator handles:
//! - Resource discovery under a corpus root
//! - Parallel, bounded parsing of resource files
//! - Building the store, collections, cross references and validation
//! - Atomic publication of the finished generation
//! - Progress reporting via a channel

use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::{AdapterOutput, AdapterRegistry, ParseTask, TaskOutput};
use crate::config::Config;
use crate::error::{ConfigError, LexiconError, ParseError, QueryError, Result};
use crate::generation::{
    GenerationId, LoadGeneration, LoadReport, LoadStatus, ResourceLoadStatus, Statistics,
};
use crate::model::{ParseStats, ResourceKind};
use crate::query::QueryEngine;
use crate::sources::{collect_files, discover_resources, layout_for};
use crate::store::CanonicalStore;
use crate::validation::{validate, ValidationReport};

// ============================================================================
// Cancellation
// ============================================================================

/// Shared flag that stops a load before its next file task starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Progress event during a load.
#[derive(Debug, Clone)]
pub enum LoadProgress {
    /// Started parsing a resource.
    ResourceStarted { kind: ResourceKind, files: usize },
    /// One parse task finished.
    FileParsed {
        kind: ResourceKind,
        file: String,
        ok: bool,
    },
    /// All tasks of a resource were merged into the store.
    ResourceLoaded {
        kind: ResourceKind,
        entities: usize,
        duration_ms: u64,
    },
    /// A new generation is visible to readers.
    GenerationPublished {
        generation: GenerationId,
        entities: usize,
        duration_ms: u64,
    },
}

/// Result of one blocking parse task.
struct TaskResult {
    kind: ResourceKind,
    index: usize,
    task: ParseTask,
    /// `None` when the task saw the cancel flag and did not run.
    result: Option<std::result::Result<TaskOutput, ParseError>>,
    elapsed_ms: u64,
}

/// Files and tasks planned for one resource.
struct ResourcePlan {
    path: PathBuf,
    tasks: Vec<ParseTask>,
    stats: ParseStats,
}

// ============================================================================
// Knowledge Base
// ============================================================================

/// The loaded knowledge base: one published generation at a time.
pub struct KnowledgeBase {
    /// Configuration.
    config: Config,
    /// Format adapter per resource kind.
    registry: Arc<AdapterRegistry>,
    /// Current generation; `None` until the first load completes.
    current: ArcSwap<Option<Arc<LoadGeneration>>>,
    /// Cancellation flag shared with running loads.
    cancel: CancelToken,
    /// Query engine with configured defaults.
    engine: QueryEngine,
    /// Serializes loads.
    load_lock: Mutex<()>,
    /// Progress callback sender.
    progress_tx: Option<mpsc::UnboundedSender<LoadProgress>>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base from configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let engine = QueryEngine::new(&config.query, &config.xref);
        Ok(Self {
            config,
            registry: Arc::new(AdapterRegistry::new()),
            current: ArcSwap::from_pointee(None),
            cancel: CancelToken::new(),
            engine,
            load_lock: Mutex::new(()),
            progress_tx: None,
        })
    }

    /// Set the progress callback channel.
    pub fn set_progress_channel(&mut self, tx: mpsc::UnboundedSender<LoadProgress>) {
        self.progress_tx = Some(tx);
    }

    /// Get a progress receiver.
    pub fn progress_channel(&mut self) -> mpsc::UnboundedReceiver<LoadProgress> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.progress_tx = Some(tx);
        rx
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Token that cancels the running (or next) load.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The published generation, if any. Callers keep the `Arc` for as long
    /// as they need a consistent view.
    pub fn current(&self) -> Option<Arc<LoadGeneration>> {
        (**self.current.load()).clone()
    }

    /// The published generation, or `QueryError::NotLoaded`.
    pub fn require_current(&self) -> Result<Arc<LoadGeneration>> {
        self.current().ok_or_else(|| QueryError::NotLoaded.into())
    }

    /// Validation report of the current generation, computing it when the
    /// load skipped validation.
    pub fn validate(&self) -> Result<ValidationReport> {
        let generation = self.require_current()?;
        Ok(match &generation.validation {
            Some(report) => report.clone(),
            None => validate(&generation.store, &generation.xref),
        })
    }

    /// Consolidated counts for the current generation.
    pub fn statistics(&self) -> Result<Statistics> {
        Ok(self.require_current()?.statistics())
    }

    /// Load every resource under a corpus root, applying configured path
    /// overrides on top of the discovered directories.
    pub async fn load_from_root(&self, root: impl AsRef<Path>) -> Result<LoadReport> {
        let root = root.as_ref();
        let discovered = discover_resources(root);
        let mut paths: HashMap<ResourceKind, PathBuf> = ResourceKind::ALL
            .into_iter()
            .map(|kind| {
                let path = discovered.get(&kind).cloned().unwrap_or_else(|| {
                    let alias = layout_for(kind).dir_aliases.first().copied().unwrap_or("");
                    root.join(alias)
                });
                (kind, path)
            })
            .collect();
        paths.extend(self.config.path_overrides()?);
        self.load_all(paths).await
    }

    /// Load from the configured corpus root and overrides.
    pub async fn load_configured(&self) -> Result<LoadReport> {
        let overrides = self.config.path_overrides()?;
        match self.config.corpus_root()? {
            Some(root) => self.load_from_root(root).await,
            None if !overrides.is_empty() => self.load_all(overrides.into_iter().collect()).await,
            None => Err(ConfigError::Invalid(
                "no corpora.root or corpora.overrides configured".to_string(),
            )
            .into()),
        }
    }

    /// Load the given resources and publish the result as a new generation.
    ///
    /// Missing paths are reported as `NotFound`; kinds absent from `paths`
    /// are reported the same way with no path. File-level failures are
    /// recorded in the report. The previous generation stays published
    /// until the new one is complete, and stays published when the load is
    /// cancelled.
    pub async fn load_all(&self, paths: HashMap<ResourceKind, PathBuf>) -> Result<LoadReport> {
        let _guard = self.load_lock.lock().await;
        let started = Instant::now();
        let mut report = LoadReport::new(Uuid::new_v4(), Utc::now());
        info!(generation = %report.generation, resources = paths.len(), "Load started");

        // Plan: enumerate files and tasks per resource.
        let mut plans: BTreeMap<ResourceKind, ResourcePlan> = BTreeMap::new();
        for kind in ResourceKind::ALL {
            let Some(path) = paths.get(&kind).cloned() else {
                report
                    .per_resource
                    .insert(kind, ResourceLoadStatus::not_found(None));
                continue;
            };
            if !path.exists() {
                info!(resource = %kind, path = %path.display(), "Resource not found");
                report
                    .per_resource
                    .insert(kind, ResourceLoadStatus::not_found(Some(path)));
                continue;
            }

            let mut stats = ParseStats::default();
            let scan_path = path.clone();
            let files = tokio::task::spawn_blocking(move || collect_files(&scan_path, kind))
                .await
                .map_err(|e| LexiconError::Task(e.to_string()))?;
            let tasks = match files {
                Ok(files) => self.registry.for_kind(kind).plan(&files),
                Err(e) => {
                    warn!(resource = %kind, path = %path.display(), error = %e, "Cannot enumerate resource files");
                    stats.record_failure(path.display().to_string(), e.to_string());
                    Vec::new()
                }
            };
            self.report_progress(LoadProgress::ResourceStarted {
                kind,
                files: tasks.len(),
            });
            plans.insert(kind, ResourcePlan { path, tasks, stats });
        }

        // Parse: one blocking task per file task, bounded by the semaphore.
        let results = self.run_tasks(&plans).await?;

        if self.cancel.is_cancelled() {
            self.cancel.reset();
            warn!(generation = %report.generation, "Load cancelled, keeping previous generation");
            return Err(LexiconError::Cancelled);
        }

        // Merge in file order per resource.
        let mut outputs: BTreeMap<ResourceKind, (AdapterOutput, u64)> = BTreeMap::new();
        for task_result in results {
            let (output, duration) = outputs.entry(task_result.kind).or_default();
            *duration += task_result.elapsed_ms;
            if let Some(result) = task_result.result {
                output.absorb(&task_result.task, result);
            }
        }

        let mut store = CanonicalStore::new();
        let mut exceptions = Vec::new();
        for (kind, plan) in plans {
            let (mut output, duration_ms) = outputs.remove(&kind).unwrap_or_default();
            self.registry.for_kind(kind).finish(&mut output);
            let mut stats = plan.stats;
            stats.merge(output.stats);

            let warnings_before = store.warnings().len();
            store.put(output.entities, output.edges);
            store.put_relations(output.relations);
            exceptions.extend(output.exceptions);
            let store_warnings: Vec<_> = store.warnings()[warnings_before..]
                .iter()
                .filter(|w| w.kind() == kind)
                .cloned()
                .collect();

            let entity_count = store.len(kind);
            let status = if entity_count == 0 {
                LoadStatus::Empty
            } else {
                LoadStatus::Loaded
            };
            info!(
                resource = %kind,
                entities = entity_count,
                files = stats.attempted,
                failed = stats.failed,
                duration_ms,
                "Resource loaded"
            );
            self.report_progress(LoadProgress::ResourceLoaded {
                kind,
                entities: entity_count,
                duration_ms,
            });
            report.per_resource.insert(
                kind,
                ResourceLoadStatus {
                    status,
                    path: Some(plan.path),
                    stats,
                    entity_count,
                    duration_ms,
                    store_warnings,
                },
            );
        }

        // Derived structures over the frozen store.
        report.duration_ms = started.elapsed().as_millis() as u64;
        let xref_config = self.config.xref.clone();
        let run_validation = self.config.load.validate_after_load;
        let build_report = report.clone();
        let generation = tokio::task::spawn_blocking(move || {
            LoadGeneration::from_store(store, exceptions, build_report, &xref_config, run_validation)
        })
        .await
        .map_err(|e| LexiconError::Task(e.to_string()))?;

        report.duration_ms = started.elapsed().as_millis() as u64;
        let entities = generation.store.total_len();
        self.current.store(Arc::new(Some(Arc::new(generation))));

        info!(
            generation = %report.generation,
            entities,
            failed_files = report.failed_files(),
            duration_ms = report.duration_ms,
            "Generation published"
        );
        self.report_progress(LoadProgress::GenerationPublished {
            generation: report.generation,
            entities,
            duration_ms: report.duration_ms,
        });

        Ok(report)
    }

    /// Run every planned task and return results sorted by resource and
    /// task order.
    async fn run_tasks(
        &self,
        plans: &BTreeMap<ResourceKind, ResourcePlan>,
    ) -> Result<Vec<TaskResult>> {
        let semaphore = Arc::new(Semaphore::new(self.config.load.max_concurrent_files.max(1)));
        let mut join_set: JoinSet<TaskResult> = JoinSet::new();

        'spawn: for (&kind, plan) in plans {
            let adapter = self.registry.for_kind(kind);
            for (index, task) in plan.tasks.iter().cloned().enumerate() {
                if self.cancel.is_cancelled() {
                    debug!(resource = %kind, "Cancel requested, not scheduling further tasks");
                    break 'spawn;
                }
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| LexiconError::Task(e.to_string()))?;
                let adapter = Arc::clone(&adapter);
                let cancel = self.cancel.clone();

                join_set.spawn_blocking(move || {
                    let _permit = permit;
                    if cancel.is_cancelled() {
                        return TaskResult {
                            kind,
                            index,
                            task,
                            result: None,
                            elapsed_ms: 0,
                        };
                    }
                    let start = Instant::now();
                    let result = catch_unwind(AssertUnwindSafe(|| adapter.parse_task(&task)))
                        .unwrap_or_else(|payload| Err(ParseError::Malformed(panic_message(&*payload))));
                    TaskResult {
                        kind,
                        index,
                        task,
                        result: Some(result),
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    }
                });
            }
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let task_result = joined.map_err(|e| LexiconError::Task(e.to_string()))?;
            if let Some(result) = &task_result.result {
                self.report_progress(LoadProgress::FileParsed {
                    kind: task_result.kind,
                    file: task_result.task.label(),
                    ok: result.is_ok(),
                });
            }
            results.push(task_result);
        }
        results.sort_by_key(|r| (r.kind, r.index));
        Ok(results)
    }

    /// Report progress.
    fn report_progress(&self, progress: LoadProgress) {
        if let Some(tx) = &self.progress_tx {
            if let Err(e) = tx.send(progress.clone()) {
                debug!("Failed to send progress event: {}", e);
            }
        }
        if let LoadProgress::FileParsed { file, ok: false, .. } = &progress {
            debug!(file = %file, "Parse task failed");
        }
    }
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("registry", &self.registry)
            .field("generation", &self.current().map(|g| g.id))
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("adapter panicked: {detail}")
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for KnowledgeBase.
pub struct KnowledgeBaseBuilder {
    config: Option<Config>,
    registry: Option<AdapterRegistry>,
    progress_tx: Option<mpsc::UnboundedSender<LoadProgress>>,
}

impl Default for KnowledgeBaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeBaseBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            registry: None,
            progress_tx: None,
        }
    }

    /// Set configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom adapter registry.
    pub fn registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set progress channel.
    pub fn progress_channel(mut self, tx: mpsc::UnboundedSender<LoadProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Build the knowledge base.
    pub fn build(self) -> Result<KnowledgeBase> {
        let config = self.config.unwrap_or_default();
        let mut kb = KnowledgeBase::new(config)?;

        if let Some(registry) = self.registry {
            kb.registry = Arc::new(registry);
        }
        if let Some(tx) = self.progress_tx {
            kb.set_progress_channel(tx);
        }

        Ok(kb)
    }
}
