//! Per-rule reconciliation: copy, render, skip, and orphan removal.
//!
//! A rule is applied in two passes. The write pass plans every destination
//! file from the source (filtered by the rule's scope, gated by `replace`)
//! and writes it through [`crate::writer`]. The orphan pass runs only for
//! directory rules with `deleteOrphaned` and strictly after all writes.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use reposync_core::types::FileRule;
use reposync_renderer::{RenderError, RepoContext, TemplateContext, TemplateEngine};

use crate::error::{io_err, SyncError};
use crate::matcher::ScopeFilter;
use crate::scanner::scan;
use crate::writer::{self, FileChange};

/// Ambient data for applying rules to one destination checkout.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationContext {
    /// Exposed to every template as `repo`.
    pub repo: Option<RepoContext>,
    pub renderer: TemplateEngine,
    pub dry_run: bool,
    /// Root the rule's source was resolved against. Lets include/exclude
    /// patterns carry the configured source path as a prefix.
    pub source_root: Option<PathBuf>,
}

/// One destination file the write pass will produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrite {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// Write plan of one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulePlan {
    /// Render through the template engine rather than copy.
    pub render: bool,
    pub writes: Vec<PlannedWrite>,
    /// Destinations left alone because `replace` is off and they exist.
    pub skipped: Vec<PathBuf>,
}

/// What applying one rule did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReport {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub is_directory: bool,
    /// The source did not exist when the rule ran.
    pub source_missing: bool,
    pub changes: Vec<FileChange>,
}

impl RuleReport {
    fn new(rule: &FileRule, is_directory: bool) -> Self {
        RuleReport {
            source: rule.source.clone(),
            dest: rule.dest.clone(),
            is_directory,
            source_missing: false,
            changes: Vec::new(),
        }
    }

    /// True if any file was (or in a dry run would be) written or deleted.
    pub fn changed(&self) -> bool {
        self.changes.iter().any(FileChange::is_change)
    }
}

/// A path with a `.git` segment.
fn in_git_dir(relative: &str) -> bool {
    relative.split('/').any(|segment| segment == ".git")
}

fn skip_destination(rule: &FileRule, dest: &Path) -> bool {
    !rule.replace && dest.exists()
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Decide which destination files the write pass produces for `rule`.
///
/// Directory rules enumerate the source tree (dotfiles included) and drop
/// out-of-scope files and anything inside a source `.git` directory. A templated single-file rule is filtered too; a plain
/// single-file copy is not.
pub fn plan(rule: &FileRule, is_directory: bool, filter: &ScopeFilter) -> Result<RulePlan, SyncError> {
    let render = rule.template.is_enabled();
    let mut plan = RulePlan {
        render,
        ..RulePlan::default()
    };

    if !is_directory {
        if render && filter.is_active() && !filter.in_scope(&rule.source) {
            tracing::debug!("out of scope: {}", rule.source.display());
            return Ok(plan);
        }
        if skip_destination(rule, &rule.dest) {
            plan.skipped.push(rule.dest.clone());
        } else {
            plan.writes.push(PlannedWrite {
                source: rule.source.clone(),
                dest: rule.dest.clone(),
            });
        }
        return Ok(plan);
    }

    for relative in scan(&rule.source, true)? {
        if in_git_dir(&relative) {
            continue;
        }
        if filter.is_active() && !filter.in_scope_relative(&relative) {
            tracing::debug!("out of scope: {relative}");
            continue;
        }
        let dest = rule.dest.join(&relative);
        if skip_destination(rule, &dest) {
            plan.skipped.push(dest);
            continue;
        }
        plan.writes.push(PlannedWrite {
            source: rule.source.join(&relative),
            dest,
        });
    }
    Ok(plan)
}

// ---------------------------------------------------------------------------
// Orphans
// ---------------------------------------------------------------------------

/// Destination-relative paths below `rule.dest` with no in-scope source file.
///
/// Out-of-scope files and anything inside a `.git` directory are never
/// reported. A missing source counts as an empty source tree.
pub fn find_orphans(rule: &FileRule, filter: &ScopeFilter) -> Result<Vec<String>, SyncError> {
    let in_scope = |relative: &str| !filter.is_active() || filter.in_scope_relative(relative);

    let should_exist: BTreeSet<String> = scan(&rule.source, true)?
        .into_iter()
        .filter(|relative| in_scope(relative))
        .collect();

    Ok(scan(&rule.dest, true)?
        .into_iter()
        .filter(|relative| !in_git_dir(relative))
        .filter(|relative| in_scope(relative))
        .filter(|relative| !should_exist.contains(relative))
        .collect())
}

fn remove_orphans(
    rule: &FileRule,
    filter: &ScopeFilter,
    dry_run: bool,
    changes: &mut Vec<FileChange>,
) -> Result<(), SyncError> {
    for relative in find_orphans(rule, filter)? {
        let path = rule.dest.join(&relative);
        changes.push(writer::remove_file(&path, dry_run)?);
        if !dry_run {
            if let Some(parent) = path.parent() {
                writer::prune_empty_dirs(parent, &rule.dest)?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Apply `rule` to its destination. `is_directory` says whether the source
/// is a directory.
pub fn apply(
    rule: &FileRule,
    is_directory: bool,
    ctx: &ReconciliationContext,
) -> Result<RuleReport, SyncError> {
    let filter = ScopeFilter::for_rule(rule, is_directory, ctx.source_root.as_deref())?;
    let plan = plan(rule, is_directory, &filter)?;
    let mut report = RuleReport::new(rule, is_directory);

    report
        .changes
        .extend(plan.skipped.into_iter().map(|path| {
            tracing::debug!("exists, not replaced: {}", path.display());
            FileChange::Skipped { path }
        }));

    if plan.render {
        let template_ctx = TemplateContext::new(rule.template.vars(), ctx.repo.as_ref());
        for write in &plan.writes {
            let change = match ctx.renderer.render_file(&write.source, &template_ctx) {
                Ok(rendered) => writer::write_rendered(&write.dest, &rendered, ctx.dry_run)?,
                Err(RenderError::NotUtf8 { .. }) => {
                    tracing::debug!("not text, copied verbatim: {}", write.source.display());
                    writer::copy_file(&write.source, &write.dest, ctx.dry_run)?
                }
                Err(err) => return Err(err.into()),
            };
            report.changes.push(change);
        }
    } else {
        for write in &plan.writes {
            report
                .changes
                .push(writer::copy_file(&write.source, &write.dest, ctx.dry_run)?);
        }
    }

    if is_directory && rule.delete_orphaned {
        remove_orphans(rule, &filter, ctx.dry_run, &mut report.changes)?;
    }

    Ok(report)
}

/// Stat the rule's source and apply it, handling a missing source.
///
/// Without `deleteOrphaned` a missing source is logged and the rule skipped.
/// With it the destination goes too: a file is deleted, a directory is
/// reconciled against an empty source and removed once nothing in it is left.
pub fn sync_rule(rule: &FileRule, ctx: &ReconciliationContext) -> Result<RuleReport, SyncError> {
    match fs::metadata(&rule.source) {
        Ok(meta) => apply(rule, meta.is_dir(), ctx),
        Err(e) if e.kind() == ErrorKind::NotFound => remove_for_missing_source(rule, ctx),
        Err(e) => Err(io_err(&rule.source, e)),
    }
}

fn remove_for_missing_source(
    rule: &FileRule,
    ctx: &ReconciliationContext,
) -> Result<RuleReport, SyncError> {
    let dest_meta = match fs::symlink_metadata(&rule.dest) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(io_err(&rule.dest, e)),
    };
    let is_directory = dest_meta.as_ref().is_some_and(|meta| meta.is_dir());
    let mut report = RuleReport::new(rule, is_directory);
    report.source_missing = true;

    if !rule.delete_orphaned {
        tracing::warn!("source not found, skipping: {}", rule.source.display());
        return Ok(report);
    }

    if dest_meta.is_none() {
        tracing::debug!(
            "source and destination both missing: {}",
            rule.source.display()
        );
        return Ok(report);
    }

    tracing::warn!(
        "source not found, removing destination: {}",
        rule.dest.display()
    );
    if !is_directory {
        report
            .changes
            .push(writer::remove_file(&rule.dest, ctx.dry_run)?);
        return Ok(report);
    }

    let filter = ScopeFilter::for_rule(rule, true, ctx.source_root.as_deref())?;
    remove_orphans(rule, &filter, ctx.dry_run, &mut report.changes)?;
    if !ctx.dry_run {
        let stop_at = rule.dest.parent().unwrap_or(&rule.dest);
        writer::prune_empty_dirs(&rule.dest, stop_at)?;
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn dir_rule(tmp: &TempDir) -> FileRule {
        FileRule::new(tmp.path().join("src"), tmp.path().join("dst"))
    }

    #[test]
    fn plan_filters_and_skips_per_file() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/a.md", "a");
        write(tmp.path(), "src/b.md", "b");
        write(tmp.path(), "src/c.txt", "c");
        write(tmp.path(), "dst/b.md", "existing");

        let mut rule = dir_rule(&tmp);
        rule.replace = false;
        rule.include = Some(strings(&["*.md"]));
        let filter = ScopeFilter::for_rule(&rule, true, None).unwrap();
        let plan = plan(&rule, true, &filter).unwrap();

        assert!(!plan.render);
        let dests: Vec<_> = plan.writes.iter().map(|w| w.dest.clone()).collect();
        assert_eq!(dests, vec![tmp.path().join("dst/a.md")]);
        assert_eq!(plan.skipped, vec![tmp.path().join("dst/b.md")]);
    }

    #[test]
    fn plain_single_file_ignores_filters() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/notes.txt", "n");
        let mut rule = FileRule::new(tmp.path().join("src/notes.txt"), tmp.path().join("out.txt"));
        rule.exclude = Some(strings(&["*.txt"]));
        let filter = ScopeFilter::for_rule(&rule, false, None).unwrap();
        assert_eq!(plan(&rule, false, &filter).unwrap().writes.len(), 1);
    }

    #[test]
    fn templated_single_file_honors_filters() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/notes.txt", "n");
        let mut rule = FileRule::new(tmp.path().join("src/notes.txt"), tmp.path().join("out.txt"));
        rule.template = reposync_core::types::TemplateSetting::Enabled;
        rule.exclude = Some(strings(&["*.txt"]));
        let filter = ScopeFilter::for_rule(&rule, false, None).unwrap();
        let plan = plan(&rule, false, &filter).unwrap();
        assert!(plan.writes.is_empty());
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn plan_never_writes_into_git_dirs() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/a.txt", "a");
        write(tmp.path(), "src/.git/HEAD", "ref: refs/heads/source");
        write(tmp.path(), "src/vendor/.git/config", "[core]");

        let rule = dir_rule(&tmp);
        let filter = ScopeFilter::for_rule(&rule, true, None).unwrap();
        let dests: Vec<_> = plan(&rule, true, &filter)
            .unwrap()
            .writes
            .into_iter()
            .map(|w| w.dest)
            .collect();
        assert_eq!(dests, vec![tmp.path().join("dst/a.txt")]);
    }

    #[test]
    fn templated_directory_copies_binary_files_verbatim() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/README.md", "# {{ title }}");
        fs::write(tmp.path().join("src/logo.png"), [0x89, 0x50, 0xff, 0x00]).unwrap();

        let mut rule = dir_rule(&tmp);
        rule.template = reposync_core::types::TemplateSetting::Enabled;
        let report = apply(&rule, true, &ReconciliationContext::default()).unwrap();

        assert_eq!(report.changes.len(), 2);
        assert_eq!(fs::read_to_string(tmp.path().join("dst/README.md")).unwrap(), "# ");
        assert_eq!(
            fs::read(tmp.path().join("dst/logo.png")).unwrap(),
            vec![0x89, 0x50, 0xff, 0x00]
        );
    }

    #[test]
    fn orphans_skip_git_and_out_of_scope_files() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/keep.txt", "k");
        write(tmp.path(), "dst/keep.txt", "k");
        write(tmp.path(), "dst/stale.txt", "s");
        write(tmp.path(), "dst/debug.log", "l");
        write(tmp.path(), "dst/.git/HEAD", "ref");
        write(tmp.path(), "dst/sub/.git/config", "x");

        let mut rule = dir_rule(&tmp);
        rule.exclude = Some(strings(&["*.log"]));
        let filter = ScopeFilter::for_rule(&rule, true, None).unwrap();
        assert_eq!(find_orphans(&rule, &filter).unwrap(), vec!["stale.txt"]);
    }

    #[test]
    fn apply_deletes_orphans_and_prunes_dirs() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/a.txt", "a");
        write(tmp.path(), "dst/old/deep/gone.txt", "x");

        let mut rule = dir_rule(&tmp);
        rule.delete_orphaned = true;
        let report = apply(&rule, true, &ReconciliationContext::default()).unwrap();

        assert!(report.changed());
        assert!(report
            .changes
            .contains(&FileChange::Deleted { path: tmp.path().join("dst/old/deep/gone.txt") }));
        assert!(!tmp.path().join("dst/old").exists());
        assert_eq!(fs::read_to_string(tmp.path().join("dst/a.txt")).unwrap(), "a");
    }

    #[test]
    fn dry_run_reports_without_touching_disk() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/a.txt", "a");
        write(tmp.path(), "dst/orphan.txt", "o");

        let mut rule = dir_rule(&tmp);
        rule.delete_orphaned = true;
        let ctx = ReconciliationContext {
            dry_run: true,
            ..Default::default()
        };
        let report = apply(&rule, true, &ctx).unwrap();

        assert!(report.changes.iter().any(|c| matches!(c, FileChange::WouldWrite { .. })));
        assert!(report.changes.iter().any(|c| matches!(c, FileChange::WouldDelete { .. })));
        assert!(!tmp.path().join("dst/a.txt").exists());
        assert!(tmp.path().join("dst/orphan.txt").exists());
    }

    #[test]
    fn missing_source_without_delete_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "dst/a.txt", "a");
        let report = sync_rule(&dir_rule(&tmp), &ReconciliationContext::default()).unwrap();
        assert!(report.source_missing);
        assert!(report.changes.is_empty());
        assert!(tmp.path().join("dst/a.txt").exists());
    }

    #[test]
    fn missing_source_with_delete_removes_destination_dir() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "dst/a.txt", "a");
        write(tmp.path(), "dst/nested/b.txt", "b");

        let mut rule = dir_rule(&tmp);
        rule.delete_orphaned = true;
        let report = sync_rule(&rule, &ReconciliationContext::default()).unwrap();

        assert!(report.source_missing);
        assert!(report.is_directory);
        assert_eq!(report.changes.len(), 2);
        assert!(!tmp.path().join("dst").exists());
    }

    #[test]
    fn missing_source_keeps_git_and_excluded_files() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "dst/a.txt", "a");
        write(tmp.path(), "dst/keep.log", "l");
        write(tmp.path(), "dst/.git/HEAD", "ref");

        let mut rule = dir_rule(&tmp);
        rule.delete_orphaned = true;
        rule.exclude = Some(strings(&["*.log"]));
        sync_rule(&rule, &ReconciliationContext::default()).unwrap();

        assert!(!tmp.path().join("dst/a.txt").exists());
        assert!(tmp.path().join("dst/keep.log").exists());
        assert!(tmp.path().join("dst/.git/HEAD").exists());
    }

    #[test]
    fn missing_source_with_delete_removes_destination_file() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "out.txt", "x");
        let mut rule = FileRule::new(tmp.path().join("absent.txt"), tmp.path().join("out.txt"));
        rule.delete_orphaned = true;

        let report = sync_rule(&rule, &ReconciliationContext::default()).unwrap();
        assert!(!report.is_directory);
        assert!(matches!(report.changes[..], [FileChange::Deleted { .. }]));
        assert!(!tmp.path().join("out.txt").exists());
    }
}
