//! Error types for lexicon-bridge.

use thiserror::Error;

/// Main error type for lexicon-bridge operations.
#[derive(Error, Debug)]
pub enum LexiconError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Load cancelled")]
    Cancelled,

    #[error("Worker task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Path expansion failed: {0}")]
    PathExpansion(String),
}

/// Errors raised while parsing a single resource file.
///
/// These never escape a load: the coordinator turns them into
/// [`FileError`](crate::model::FileError) records on the resource's stats.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Unexpected root element: expected <{expected}>, found <{found}>")]
    UnexpectedRoot { expected: String, found: String },

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    #[error("Malformed record: {0}")]
    Malformed(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Canonical store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Cycle detected while walking ancestors of {kind}:{id}")]
    CycleDetected { kind: String, id: String },
}

/// Invalid query arguments. The only error class a caller sees from queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Invalid confidence threshold: {0} (expected 0.0..=1.0)")]
    InvalidConfidence(f64),

    #[error("Invalid pattern type: {0}")]
    InvalidPatternType(String),

    #[error("No knowledge base loaded")]
    NotLoaded,
}

/// Export and snapshot import errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Failed to write export: {0}")]
    Write(String),
}

/// Result type alias for lexicon-bridge operations.
pub type Result<T> = std::result::Result<T, LexiconError>;
