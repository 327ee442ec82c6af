//! Per-repository orchestration: apply every rule of one repository to its
//! checkout and commit what changed.

use std::path::{Path, PathBuf};
use std::process::Command;

use reposync_core::{RepoConfig, RepoInfo, SyncSettings};
use reposync_renderer::{RepoContext, TemplateEngine};

use crate::engine::{self, ReconciliationContext, RuleReport};
use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// WorkingTree
// ---------------------------------------------------------------------------

/// Version-control view of a destination checkout.
pub trait WorkingTree {
    /// True if anything at or below `path` differs from the last commit.
    fn has_changes(&self, path: &Path) -> Result<bool, SyncError>;

    /// Stage everything and commit with `message`.
    fn commit(&self, message: &str) -> Result<(), SyncError>;
}

/// A checkout managed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitWorkingTree {
    dir: PathBuf,
}

impl GitWorkingTree {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        GitWorkingTree { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run git in the checkout and return its trimmed stdout.
    fn git(&self, args: &[&str]) -> Result<String, SyncError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| io_err(&self.dir, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(SyncError::Git {
                dir: self.dir.clone(),
                message: format!("git {} failed: {}", args.join(" "), stderr.trim()),
            })
        }
    }
}

impl WorkingTree for GitWorkingTree {
    fn has_changes(&self, path: &Path) -> Result<bool, SyncError> {
        let path = path.to_string_lossy();
        let status = self.git(&["status", "--porcelain", "--", &path])?;
        Ok(!status.is_empty())
    }

    fn commit(&self, message: &str) -> Result<(), SyncError> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "-m", message])?;
        tracing::info!("committed in {}: {message}", self.dir.display());
        Ok(())
    }
}

/// A checkout without version control. Every change the engine reports
/// counts; commits are only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTree;

impl WorkingTree for PlainTree {
    fn has_changes(&self, _path: &Path) -> Result<bool, SyncError> {
        Ok(true)
    }

    fn commit(&self, message: &str) -> Result<(), SyncError> {
        tracing::debug!("no version control, not committing: {message}");
        Ok(())
    }
}

/// Git if `dir` holds a `.git` entry, otherwise a plain tree.
pub fn default_tree(dir: &Path) -> Box<dyn WorkingTree> {
    if dir.join(".git").exists() {
        Box::new(GitWorkingTree::new(dir))
    } else {
        Box::new(PlainTree)
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// A rule whose destination changed, with the commit message describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedEntry {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub is_directory: bool,
    /// The destination existed before the rule ran.
    pub existed: bool,
    pub message: String,
}

/// Outcome of syncing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReport {
    pub repo: RepoInfo,
    pub checkout: PathBuf,
    /// The checkout was missing; no rule ran.
    pub skipped: bool,
    pub rules: Vec<RuleReport>,
    pub changed: Vec<ChangedEntry>,
    /// Commit messages actually committed, in order.
    pub commits: Vec<String>,
}

impl RepoReport {
    fn new(repo: &RepoInfo, checkout: PathBuf) -> Self {
        RepoReport {
            repo: repo.clone(),
            checkout,
            skipped: false,
            rules: Vec::new(),
            changed: Vec::new(),
            commits: Vec::new(),
        }
    }
}

fn rule_commit_message(prefix: &str, source: &Path, dest: &Path, existed: bool, removed: bool) -> String {
    let (source, dest) = (source.display(), dest.display());
    if removed {
        format!("{prefix} removed local '{dest}'")
    } else if existed {
        format!("{prefix} synced local '{dest}' with remote '{source}'")
    } else {
        format!("{prefix} created local '{dest}' from remote '{source}'")
    }
}

fn batch_commit_message(prefix: &str, source_repository: &str) -> String {
    format!("{prefix} synced file(s) with {source_repository}")
}

// ---------------------------------------------------------------------------
// sync_repository
// ---------------------------------------------------------------------------

/// Apply every rule in `config` to the repository's checkout under
/// `settings.workdir`, in configuration order, committing through `tree`.
pub fn sync_repository(
    settings: &SyncSettings,
    config: &RepoConfig,
    tree: &dyn WorkingTree,
) -> Result<RepoReport, SyncError> {
    let checkout = config.repo.checkout_dir(&settings.workdir);
    let mut report = RepoReport::new(&config.repo, checkout.clone());

    if !checkout.is_dir() {
        tracing::warn!(
            "checkout for {} not found at {}, skipping",
            config.repo,
            checkout.display()
        );
        report.skipped = true;
        return Ok(report);
    }

    let ctx = ReconciliationContext {
        repo: Some(RepoContext::from_repo(&config.repo)),
        renderer: TemplateEngine::new(settings.autoescape),
        dry_run: settings.dry_run,
        source_root: Some(settings.source_root.clone()),
    };

    for (index, rule) in config.rules.iter().enumerate() {
        let resolved = rule.resolve(&settings.source_root, &checkout);
        let existed = resolved.dest.exists();
        tracing::debug!(
            "{}: rule #{index} {} -> {}",
            config.repo,
            rule.source.display(),
            rule.dest.display()
        );

        let rule_report = engine::sync_rule(&resolved, &ctx).map_err(|e| SyncError::Rule {
            index,
            source_path: rule.source.clone(),
            dest: rule.dest.clone(),
            error: Box::new(e),
        })?;

        let changed = rule_report.changed()
            && (settings.dry_run || tree.has_changes(&resolved.dest)?);
        if changed {
            let message = rule_commit_message(
                &settings.commit_prefix,
                &rule.source,
                &rule.dest,
                existed,
                rule_report.source_missing,
            );
            if settings.commit_each_file && !settings.dry_run {
                tree.commit(&message)?;
                report.commits.push(message.clone());
            }
            report.changed.push(ChangedEntry {
                source: rule.source.clone(),
                dest: rule.dest.clone(),
                is_directory: rule_report.is_directory,
                existed,
                message,
            });
        }
        report.rules.push(rule_report);
    }

    if !settings.commit_each_file && !settings.dry_run && !report.changed.is_empty() {
        let message = batch_commit_message(&settings.commit_prefix, &settings.source_repository);
        tree.commit(&message)?;
        report.commits.push(message);
    }

    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
