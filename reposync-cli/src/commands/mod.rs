//! Subcommands and the arguments they share.

pub mod diff;
pub mod rules;
pub mod sync;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use reposync_core::config::{self, DEFAULT_CONFIG_PATH};
use reposync_core::{RepoConfig, SyncSettings};

/// Where the sync config lives and which of its repositories to process.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Sync config file.
    #[arg(long, short = 'c', value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Only process this repository (`user/name[@branch]` or full name). Repeatable.
    #[arg(long = "repo", value_name = "NAME")]
    pub repos: Vec<String>,
}

impl ConfigArgs {
    /// Load the config and keep the repositories selected with `--repo`.
    pub fn load(&self) -> Result<Vec<RepoConfig>> {
        let configs = config::load(&self.config)
            .with_context(|| format!("failed to load sync config {}", self.config.display()))?;
        if self.repos.is_empty() {
            return Ok(configs);
        }

        for query in &self.repos {
            if !configs.iter().any(|c| c.matches(query)) {
                bail!("repository '{query}' is not in {}", self.config.display());
            }
        }
        Ok(configs
            .into_iter()
            .filter(|c| self.repos.iter().any(|q| c.matches(q)))
            .collect())
    }
}

/// Local source checkout and destination checkouts directory.
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// Root of the source repository checkout; rule sources resolve against it.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub source: PathBuf,

    /// Directory holding destination checkouts (`<host>/<user>/<name>@<branch>`).
    #[arg(long, value_name = "DIR", default_value = "tmp")]
    pub workdir: PathBuf,

    /// Do not HTML-escape rendered template output.
    #[arg(long)]
    pub no_autoescape: bool,
}

impl CheckoutArgs {
    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            source_root: self.source.clone(),
            workdir: self.workdir.clone(),
            autoescape: !self.no_autoescape,
            ..SyncSettings::default()
        }
    }
}
