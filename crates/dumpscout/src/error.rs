//! Error types for topology discovery

use std::io;
use thiserror::Error;

/// Discovery error type
///
/// Every variant is fatal to a build: discovery never returns a partial topology.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Configuration conflict: {0}")]
    ConfigurationConflict(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Apply file routing on file '{path}' failed: {source}")]
    PathRouting {
        path: String,
        #[source]
        source: RuleError,
    },

    #[error("Apply table routing on `{schema}`.`{table}` failed: {source}")]
    TableRouting {
        schema: String,
        table: String,
        #[source]
        source: RuleError,
    },

    #[error("Missing declaration: {0}")]
    MissingDeclaration(String),

    #[error("Invalid {kind} file, duplicated item '{identity}' - {path}")]
    DuplicateDeclaration {
        kind: &'static str,
        identity: String,
        path: String,
    },

    #[error("List files failed under '{root}': {message}")]
    Enumeration { root: String, message: String },

    #[error("Discovery cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DiscoveryError {
    pub(crate) fn enumeration(root: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Enumeration {
            root: root.into(),
            message: err.to_string(),
        }
    }
}

/// Errors raised while compiling or applying routing and filter rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("unknown file type '{0}'")]
    UnknownFileType(String),

    #[error("unknown compression type '{0}'")]
    UnknownCompression(String),

    #[error("rule must set exactly one of `pattern` or `path`")]
    MissingPattern,

    #[error("matches {count} {level} rules, please check the route rules")]
    AmbiguousRoute { count: usize, level: &'static str },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DiscoveryError>;
