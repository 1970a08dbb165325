//! Resource directory discovery and file enumeration.

use glob::{MatchOptions, Pattern};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::layout::{corpus_layout, layout_for, ResourceLayout};
use crate::model::ResourceKind;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// First existing alias directory for `kind` under `root`.
pub fn resource_dir(root: &Path, kind: ResourceKind) -> Option<PathBuf> {
    layout_for(kind)
        .dir_aliases
        .iter()
        .map(|alias| root.join(alias))
        .find(|candidate| candidate.is_dir())
}

/// Discover every resource directory present under a corpus root.
///
/// Kinds with no matching directory are absent from the result.
pub fn discover_resources(root: &Path) -> BTreeMap<ResourceKind, PathBuf> {
    corpus_layout()
        .filter_map(|layout| {
            let dir = resource_dir(root, layout.kind)?;
            debug!(resource = %layout.kind, dir = %dir.display(), "Discovered resource directory");
            Some((layout.kind, dir))
        })
        .collect()
}

/// Compiled include/exclude globs for one layout entry.
#[derive(Debug)]
pub struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl FileFilter {
    pub fn new(layout: &ResourceLayout) -> Self {
        Self {
            include: compile(layout.include),
            exclude: compile(layout.exclude),
        }
    }

    /// Check a `/`-separated path relative to the resource directory.
    pub fn matches(&self, rel_path: &str) -> bool {
        if self
            .exclude
            .iter()
            .any(|p| p.matches_with(rel_path, MATCH_OPTIONS))
        {
            return false;
        }
        self.include
            .iter()
            .any(|p| p.matches_with(rel_path, MATCH_OPTIONS))
    }
}

fn compile(patterns: &[&str]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("Invalid layout pattern '{}': {}", p, e);
                None
            }
        })
        .collect()
}

/// Enumerate the files of one resource, sorted by relative path.
///
/// A path that names a single file is returned as-is. Symlinked
/// directories are followed once per real directory.
pub fn collect_files(path: &Path, kind: ResourceKind) -> std::io::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let filter = FileFilter::new(layout_for(kind));
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(std::fs::canonicalize(path)?);
    scan_directory(path, path, &filter, &mut visited, &mut found)?;
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found.into_iter().map(|(_, p)| p).collect())
}

fn scan_directory(
    base: &Path,
    dir: &Path,
    filter: &FileFilter,
    visited: &mut HashSet<PathBuf>,
    found: &mut Vec<(String, PathBuf)>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                debug!("Cannot read metadata for {}: {}", path.display(), e);
                continue;
            }
        };

        if metadata.is_dir() {
            match std::fs::canonicalize(&path) {
                Ok(real) if visited.insert(real.clone()) => {}
                Ok(_) => {
                    debug!("Skipping already scanned directory {}", path.display());
                    continue;
                }
                Err(e) => {
                    debug!("Cannot resolve directory {}: {}", path.display(), e);
                    continue;
                }
            }
            if let Err(e) = scan_directory(base, &path, filter, visited, found) {
                debug!("Error scanning directory {}: {}", path.display(), e);
            }
        } else if metadata.is_file() {
            let rel_path = relative_path(base, &path);
            if filter.matches(&rel_path) {
                found.push((rel_path, path));
            }
        }
    }
    Ok(())
}

fn relative_path(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_corpus() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("vn_api")).unwrap();
        fs::write(root.join("vn_api/give-13.1.xml"), "<VNCLASS ID=\"give-13.1\"/>").unwrap();
        fs::write(root.join("vn_api/README"), "notes").unwrap();

        fs::create_dir_all(root.join("framenet/frame")).unwrap();
        fs::write(root.join("framenet/frame/Giving.xml"), "<frame/>").unwrap();
        fs::write(root.join("framenet/frameIndex.xml"), "<frameIndex/>").unwrap();
        fs::write(root.join("framenet/frRelation.xml"), "<frameRelations/>").unwrap();

        fs::create_dir_all(root.join("wordnet")).unwrap();
        for name in ["data.verb", "index.verb", "index.sense", "verb.exc"] {
            fs::write(root.join("wordnet").join(name), "").unwrap();
        }

        temp_dir
    }

    #[test]
    fn test_discover_resources() {
        let dir = create_test_corpus();
        let found = discover_resources(dir.path());
        assert_eq!(found.len(), 3);
        assert_eq!(
            found.get(&ResourceKind::ClassHierarchy),
            Some(&dir.path().join("vn_api"))
        );
        assert!(!found.contains_key(&ResourceKind::PredicateBank));
    }

    #[test]
    fn test_collect_files_filters_by_layout() {
        let dir = create_test_corpus();
        let files = collect_files(&dir.path().join("framenet"), ResourceKind::FrameInventory)
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["frRelation.xml", "Giving.xml"]);
    }

    #[test]
    fn test_collect_files_excludes() {
        let dir = create_test_corpus();
        let files =
            collect_files(&dir.path().join("wordnet"), ResourceKind::SynsetNetwork).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|p| !p.ends_with("index.sense")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_scanned_once() {
        let dir = create_test_corpus();
        let framenet = dir.path().join("framenet");
        std::os::unix::fs::symlink(&framenet, framenet.join("frame/back")).unwrap();

        let files = collect_files(&framenet, ResourceKind::FrameInventory).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["frRelation.xml", "Giving.xml"]);
    }

    #[test]
    fn test_single_file_path() {
        let dir = create_test_corpus();
        let file = dir.path().join("vn_api/give-13.1.xml");
        let files = collect_files(&file, ResourceKind::ClassHierarchy).unwrap();
        assert_eq!(files, vec![file]);
    }
}
