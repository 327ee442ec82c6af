//! Error types for reposync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or interpreting sync configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse sync config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A repository key or `repos:` line could not be parsed.
    #[error("invalid repository '{value}': {reason}")]
    InvalidRepo { value: String, reason: String },

    /// A file entry under a repository or group is malformed.
    #[error("invalid file entry for {repo}: {reason}")]
    InvalidEntry { repo: String, reason: String },
}
