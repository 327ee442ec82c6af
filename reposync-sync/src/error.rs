//! Error types for reposync-sync.

use std::path::PathBuf;

use thiserror::Error;

use reposync_core::ConfigError;
use reposync_renderer::RenderError;

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An error from the sync configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An include/exclude pattern is not a valid glob.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Directory traversal failed below `path`.
    #[error("failed to scan {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A `git` invocation in a destination checkout failed.
    #[error("git error in {dir}: {message}")]
    Git { dir: PathBuf, message: String },

    /// A rule failed; carries the rule's position and configured paths.
    #[error("rule #{index} ({source_path} -> {dest}) failed: {error}")]
    Rule {
        index: usize,
        source_path: PathBuf,
        dest: PathBuf,
        #[source]
        error: Box<SyncError>,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
