//! Unified diff preview for `reposync diff`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use reposync_core::{FileRule, RepoConfig, RepoInfo, SyncSettings};
use reposync_renderer::{RenderError, RepoContext, TemplateContext, TemplateEngine};

use crate::engine::{find_orphans, plan};
use crate::error::io_err;
use crate::matcher::ScopeFilter;
use crate::SyncError;

/// A single destination file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub deleted: bool,
    pub unified_diff: String,
}

/// Diff result for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRepoResult {
    pub repo: RepoInfo,
    /// The checkout was missing; nothing was compared.
    pub skipped: bool,
    pub diffs: Vec<FileDiff>,
}

/// Compute what `sync` would write or delete in the repository's checkout,
/// as unified diffs. No files are written.
pub fn diff_repository(settings: &SyncSettings, config: &RepoConfig) -> Result<DiffRepoResult, SyncError> {
    let checkout = config.repo.checkout_dir(&settings.workdir);
    let mut result = DiffRepoResult {
        repo: config.repo.clone(),
        skipped: false,
        diffs: Vec::new(),
    };
    if !checkout.is_dir() {
        tracing::warn!("checkout for {} not found at {}", config.repo, checkout.display());
        result.skipped = true;
        return Ok(result);
    }

    let repo = RepoContext::from_repo(&config.repo);
    let differ = Differ {
        checkout: &checkout,
        renderer: TemplateEngine::new(settings.autoescape),
        repo: &repo,
        source_root: &settings.source_root,
    };
    for rule in &config.rules {
        let resolved = rule.resolve(&settings.source_root, &checkout);
        differ.rule(&resolved, &mut result.diffs)?;
    }
    Ok(result)
}

struct Differ<'a> {
    checkout: &'a Path,
    renderer: TemplateEngine,
    repo: &'a RepoContext,
    source_root: &'a Path,
}

impl Differ<'_> {
    fn rule(&self, rule: &FileRule, diffs: &mut Vec<FileDiff>) -> Result<(), SyncError> {
        let is_directory = match fs::metadata(&rule.source) {
            Ok(meta) => meta.is_dir(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return self.missing_source(rule, diffs);
            }
            Err(e) => return Err(io_err(&rule.source, e)),
        };

        let filter = ScopeFilter::for_rule(rule, is_directory, Some(self.source_root))?;
        let plan = plan(rule, is_directory, &filter)?;
        let template_ctx = TemplateContext::new(rule.template.vars(), Some(self.repo));

        for write in &plan.writes {
            let rendered = if plan.render {
                match self.renderer.render_file(&write.source, &template_ctx) {
                    Ok(text) => Some(text.into_bytes()),
                    Err(RenderError::NotUtf8 { .. }) => None,
                    Err(err) => return Err(err.into()),
                }
            } else {
                None
            };
            let new = match rendered {
                Some(bytes) => bytes,
                None => fs::read(&write.source).map_err(|e| io_err(&write.source, e))?,
            };
            let old = read_existing(&write.dest)?;
            if old.as_deref() == Some(new.as_slice()) {
                continue;
            }
            diffs.push(self.file_diff(&write.dest, old.as_deref(), Some(new.as_slice())));
        }

        if is_directory && rule.delete_orphaned {
            self.orphans(rule, &filter, diffs)?;
        }
        Ok(())
    }

    fn missing_source(&self, rule: &FileRule, diffs: &mut Vec<FileDiff>) -> Result<(), SyncError> {
        if !rule.delete_orphaned {
            return Ok(());
        }
        if rule.dest.is_dir() {
            let filter = ScopeFilter::for_rule(rule, true, Some(self.source_root))?;
            return self.orphans(rule, &filter, diffs);
        }
        if let Some(old) = read_existing(&rule.dest)? {
            diffs.push(self.file_diff(&rule.dest, Some(old.as_slice()), None));
        }
        Ok(())
    }

    fn orphans(&self, rule: &FileRule, filter: &ScopeFilter, diffs: &mut Vec<FileDiff>) -> Result<(), SyncError> {
        for relative in find_orphans(rule, filter)? {
            let path = rule.dest.join(relative);
            let old = read_existing(&path)?;
            diffs.push(self.file_diff(&path, old.as_deref(), None));
        }
        Ok(())
    }

    /// `None` on either side means the file is absent there.
    fn file_diff(&self, path: &Path, old: Option<&[u8]>, new: Option<&[u8]>) -> FileDiff {
        let relative = path.strip_prefix(self.checkout).unwrap_or(path);
        let header = |side: &str, content: Option<&[u8]>| match content {
            Some(_) => format!("{side}/{}", relative.display()),
            None => "/dev/null".to_string(),
        };
        let (old_header, new_header) = (header("a", old), header("b", new));
        let deleted = new.is_none();
        let (old, new) = (old.unwrap_or_default(), new.unwrap_or_default());

        let unified_diff = match (std::str::from_utf8(old), std::str::from_utf8(new)) {
            (Ok(old), Ok(new)) => {
                let (old, new) = (normalize_line_endings(old), normalize_line_endings(new));
                TextDiff::from_lines(&old, &new)
                    .unified_diff()
                    .header(&old_header, &new_header)
                    .context_radius(3)
                    .to_string()
            }
            _ => format!("Binary files {old_header} and {new_header} differ\n"),
        };

        FileDiff {
            path: path.to_path_buf(),
            deleted,
            unified_diff,
        }
    }
}

fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, SyncError> {
    match fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}
