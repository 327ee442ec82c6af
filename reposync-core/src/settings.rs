//! Run settings shared by the orchestrator and the CLI.

use std::path::PathBuf;

/// Commit message prefix used when none is configured.
pub const DEFAULT_COMMIT_PREFIX: &str = "🔄";

/// Settings for one `reposync sync` run.
///
/// Built once by the caller and passed by reference; the sync engine itself
/// never sees this struct, only the per-rule data derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Root of the local source checkout; rule sources resolve against it.
    pub source_root: PathBuf,
    /// Directory holding destination checkouts
    /// (`<workdir>/<host>/<user>/<name>@<branch>`).
    pub workdir: PathBuf,
    pub commit_prefix: String,
    /// Commit after every rule instead of once per repository.
    pub commit_each_file: bool,
    /// Report what would change without touching any destination.
    pub dry_run: bool,
    /// Label for the source repository used in commit messages.
    pub source_repository: String,
    /// HTML-escape rendered template output.
    pub autoescape: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            source_root: PathBuf::from("."),
            workdir: PathBuf::from("tmp"),
            commit_prefix: DEFAULT_COMMIT_PREFIX.to_string(),
            commit_each_file: true,
            dry_run: false,
            source_repository: "the source repository".to_string(),
            autoescape: true,
        }
    }
}
