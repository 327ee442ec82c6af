//! `reposync sync`: apply the configured rules to every repository checkout.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use reposync_core::settings::DEFAULT_COMMIT_PREFIX;
use reposync_sync::{default_tree, pipeline, FileChange, RepoReport};

use super::{CheckoutArgs, ConfigArgs};

/// Arguments for `reposync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub checkout: CheckoutArgs,

    /// Show what would change without writing, deleting, or committing.
    #[arg(long)]
    pub dry_run: bool,

    /// Commit once per repository instead of once per rule.
    #[arg(long)]
    pub single_commit: bool,

    /// Prefix for commit messages.
    #[arg(long, value_name = "STR", default_value = DEFAULT_COMMIT_PREFIX)]
    pub commit_prefix: String,

    /// Name of the source repository, used in single-commit messages.
    #[arg(long, value_name = "NAME")]
    pub source_repository: Option<String>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let configs = self.config.load()?;
        let mut settings = self.checkout.settings();
        settings.dry_run = self.dry_run;
        settings.commit_each_file = !self.single_commit;
        settings.commit_prefix = self.commit_prefix;
        if let Some(name) = self.source_repository {
            settings.source_repository = name;
        }

        if configs.is_empty() {
            println!("No repositories configured in {}.", self.config.config.display());
            return Ok(());
        }

        let outcomes = pipeline::run(&settings, &configs, default_tree);
        let mut failed = 0;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(report) => print_report(report, settings.dry_run),
                Err(e) => {
                    failed += 1;
                    eprintln!("{} '{}' failed: {e:#}", "✗".red(), outcome.repo);
                }
            }
        }

        if failed > 0 {
            bail!("{failed} of {} repositories failed to sync", outcomes.len());
        }
        Ok(())
    }
}

fn print_report(report: &RepoReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if report.skipped {
        println!(
            "{prefix}{} '{}' skipped — no checkout at {}",
            "!".yellow(),
            report.repo,
            report.checkout.display()
        );
        return;
    }

    let changes: Vec<&FileChange> = report.rules.iter().flat_map(|r| &r.changes).collect();
    let written = changes
        .iter()
        .filter(|c| {
            matches!(
                c,
                FileChange::Written { .. } | FileChange::Rendered { .. } | FileChange::WouldWrite { .. }
            )
        })
        .count();
    let deleted = changes
        .iter()
        .filter(|c| matches!(c, FileChange::Deleted { .. } | FileChange::WouldDelete { .. }))
        .count();
    let unchanged = changes.len() - written - deleted;

    if written == 0 && deleted == 0 {
        println!("{prefix}{} '{}' — nothing to do", "✓".green(), report.repo);
        return;
    }

    println!(
        "{prefix}{} '{}' synced ({written} written, {deleted} deleted, {unchanged} unchanged)",
        "✓".green(),
        report.repo,
    );
    for change in changes {
        let path = relative(change.path(), &report.checkout);
        match change {
            FileChange::Written { .. } | FileChange::Rendered { .. } => println!("  ✎  {path}"),
            FileChange::Deleted { .. } => println!("  −  {path}"),
            FileChange::WouldWrite { .. } | FileChange::WouldDelete { .. } => {
                println!("  ~  {path}")
            }
            FileChange::Unchanged { .. } | FileChange::Skipped { .. } => println!("  ·  {path}"),
        }
    }
    for message in &report.commits {
        println!("  {} {message}", "committed:".bright_black());
    }
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
