//! Configuration settings for lexicon-bridge.

use crate::config::logging::LoggingConfig;
use crate::error::{ConfigError, Result};
use crate::model::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corpora: CorporaConfig,
    pub load: LoadConfig,
    pub xref: XrefConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("lexicon.toml"),
            dirs::config_dir()
                .map(|p| p.join("lexicon-bridge/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.load.max_concurrent_files == 0 {
            return Err(
                ConfigError::Invalid("load.max_concurrent_files must be > 0".to_string()).into(),
            );
        }

        if self.xref.min_shared_members == 0 {
            return Err(
                ConfigError::Invalid("xref.min_shared_members must be > 0".to_string()).into(),
            );
        }

        let confidence = self.xref.default_min_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ConfigError::Invalid(format!(
                "xref.default_min_confidence must be within 0.0..=1.0, got {confidence}"
            ))
            .into());
        }

        for name in self.corpora.overrides.keys() {
            name.parse::<ResourceKind>().map_err(|_| {
                ConfigError::Invalid(format!("corpora.overrides: unknown resource '{name}'"))
            })?;
        }

        Ok(())
    }

    /// Expand the corpus root directory, if one is configured.
    pub fn corpus_root(&self) -> Result<Option<PathBuf>> {
        self.corpora.root.as_deref().map(expand_path).transpose()
    }

    /// Explicit per-resource paths from `corpora.overrides`.
    pub fn path_overrides(&self) -> Result<BTreeMap<ResourceKind, PathBuf>> {
        let mut overrides = BTreeMap::new();
        for (name, path) in &self.corpora.overrides {
            let kind = name.parse::<ResourceKind>().map_err(|_| {
                ConfigError::Invalid(format!("corpora.overrides: unknown resource '{name}'"))
            })?;
            overrides.insert(kind, expand_path(path)?);
        }
        Ok(overrides)
    }
}

fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| ConfigError::PathExpansion(format!("{raw}: {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Where the resource directories live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorporaConfig {
    /// Directory scanned for resource directories by their known names.
    pub root: Option<String>,
    /// Explicit directory per resource name, taking precedence over discovery.
    pub overrides: BTreeMap<String, String>,
}

/// Load pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Maximum files parsed at the same time.
    pub max_concurrent_files: usize,
    /// Run the validator as part of every load.
    pub validate_after_load: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            validate_after_load: true,
        }
    }
}

/// Cross-reference index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefConfig {
    /// Infer links between entities that share member lexemes.
    pub infer_links: bool,
    /// Shared lexemes required before a link is inferred.
    pub min_shared_members: usize,
    /// Threshold applied when a caller does not pass one.
    pub default_min_confidence: f64,
}

impl Default for XrefConfig {
    fn default() -> Self {
        Self {
            infer_links: true,
            min_shared_members: 1,
            default_min_confidence: 0.0,
        }
    }
}

/// Query engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Depth bound for hierarchy and path queries when a caller does not pass one.
    pub default_max_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_max_depth: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::logging::LogFormat;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.load.max_concurrent_files > 0);
        assert!(config.xref.infer_links);
        assert_eq!(config.xref.min_shared_members, 1);
        assert_eq!(config.xref.default_min_confidence, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [corpora]
            root = "/data/corpora"

            [corpora.overrides]
            SynsetNetwork = "/opt/wordnet/dict"

            [load]
            max_concurrent_files = 2
            validate_after_load = false

            [xref]
            min_shared_members = 2
            default_min_confidence = 0.25

            [logging]
            format = "json"
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.load.max_concurrent_files, 2);
        assert!(!config.load.validate_after_load);
        assert_eq!(config.xref.min_shared_members, 2);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.corpus_root().unwrap(),
            Some(PathBuf::from("/data/corpora"))
        );
        let overrides = config.path_overrides().unwrap();
        assert_eq!(
            overrides.get(&ResourceKind::SynsetNetwork),
            Some(&PathBuf::from("/opt/wordnet/dict"))
        );
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let toml = r#"
            [load]
            max_concurrent_files = 0
        "#;
        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_validate_confidence_range() {
        let toml = r#"
            [xref]
            default_min_confidence = 1.5
        "#;
        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_validate_unknown_override() {
        let toml = r#"
            [corpora.overrides]
            Thesaurus = "/tmp/thesaurus"
        "#;
        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lexicon.toml");
        std::fs::write(&path, "[query]\ndefault_max_depth = 3\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.query.default_max_depth, 3);
    }
}
