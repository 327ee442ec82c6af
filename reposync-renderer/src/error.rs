//! Error types for reposync-renderer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from template rendering operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// A template file failed to parse or render; `detail` is the full Tera error chain.
    #[error("failed to render template {path}: {detail}")]
    Template { path: PathBuf, detail: String },

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while reading a template file.
    #[error("template io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template files must be UTF-8 text.
    #[error("template {path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
}
