//! Shared sync entrypoint used by the CLI.

use std::path::Path;

use reposync_core::{RepoConfig, RepoInfo, SyncSettings};

use crate::orchestrator::{sync_repository, RepoReport, WorkingTree};
use crate::SyncError;

/// Result of syncing one repository.
#[derive(Debug)]
pub struct RepoOutcome {
    pub repo: RepoInfo,
    pub result: Result<RepoReport, SyncError>,
}

/// Sync every repository in `configs`, in order.
///
/// A failing repository does not stop the run; its error is returned in
/// its [`RepoOutcome`]. `tree_for` supplies the working tree for a checkout
/// directory (see [`crate::orchestrator::default_tree`]).
pub fn run<F>(settings: &SyncSettings, configs: &[RepoConfig], mut tree_for: F) -> Vec<RepoOutcome>
where
    F: FnMut(&Path) -> Box<dyn WorkingTree>,
{
    configs
        .iter()
        .map(|config| {
            let checkout = config.repo.checkout_dir(&settings.workdir);
            let tree = tree_for(&checkout);
            let result = sync_repository(settings, config, tree.as_ref());
            if let Err(e) = &result {
                tracing::warn!("{}: sync failed: {e}", config.repo);
            }
            RepoOutcome {
                repo: config.repo.clone(),
                result,
            }
        })
        .collect()
}
