//! Include/exclude glob scoping for rules.
//!
//! Patterns are written either relative to the rule's source directory or
//! with the source path as a prefix (`templates/*.md` and `*.md` are the same
//! thing for a rule whose source is `templates/`). A trailing `/` means the
//! directory and everything beneath it.
//!
//! A candidate path is tested twice, once as its root-relative path and once
//! as its bare file name; either hit counts. `*` never crosses `/` and
//! wildcards never match a leading dot unless the pattern spells it out.

use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};

use reposync_core::types::FileRule;

use crate::error::SyncError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// `path` as a `/`-separated string.
pub(crate) fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `candidate` relative to `root` as a `/`-separated string, or `None` when
/// the candidate lies outside `root`.
fn relative_to(root: &Path, candidate: &Path) -> Option<String> {
    let root = normalize_lexically(root);
    let candidate = normalize_lexically(candidate);
    candidate
        .strip_prefix(&root)
        .ok()
        .map(to_slash)
        .filter(|rel| !rel.starts_with("../") && rel != "..")
}

/// Prefix form of a root path: `/`-separated, no leading `./`, no trailing `/`.
fn prefix_of(root: &Path) -> String {
    let slashed = to_slash(root);
    let trimmed = slashed.strip_prefix("./").unwrap_or(&slashed);
    trimmed.trim_end_matches('/').to_string()
}

fn normalize_pattern(raw: &str, prefixes: &[String]) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut pattern = trimmed.replace('\\', "/");
    if let Some(stripped) = pattern.strip_prefix("./") {
        pattern = stripped.to_string();
    }
    for prefix in prefixes.iter().filter(|p| !p.is_empty()) {
        if let Some(stripped) = pattern.strip_prefix(&format!("{prefix}/")) {
            pattern = stripped.to_string();
            break;
        }
    }
    if pattern.ends_with('/') {
        pattern.push_str("**");
    }
    Some(pattern)
}

// ---------------------------------------------------------------------------
// PatternSet
// ---------------------------------------------------------------------------

/// A compiled, non-empty list of glob patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile `patterns` relative to `root`.
    ///
    /// Returns `Ok(None)` when no pattern survives trimming; callers treat an
    /// absent set as "no constraint".
    pub fn compile(patterns: &[String], root: &Path) -> Result<Option<Self>, SyncError> {
        Self::compile_with_prefixes(patterns, &[prefix_of(root)])
    }

    /// Like [`PatternSet::compile`], stripping whichever of `prefixes` a
    /// pattern starts with.
    pub fn compile_with_prefixes(
        patterns: &[String],
        prefixes: &[String],
    ) -> Result<Option<Self>, SyncError> {
        let mut compiled = Vec::new();
        for raw in patterns {
            let Some(pattern) = normalize_pattern(raw, prefixes) else {
                continue;
            };
            let glob = Pattern::new(&pattern).map_err(|source| SyncError::Pattern {
                pattern: raw.trim().to_string(),
                source,
            })?;
            compiled.push(glob);
        }
        if compiled.is_empty() {
            return Ok(None);
        }
        Ok(Some(PatternSet { patterns: compiled }))
    }

    /// True if any pattern matches the root-relative path or its file name.
    pub fn matches(&self, relative: &str) -> bool {
        let name = relative.rsplit('/').next().unwrap_or(relative);
        self.patterns.iter().any(|pattern| {
            pattern.matches_with(relative, MATCH_OPTIONS) || pattern.matches_with(name, MATCH_OPTIONS)
        })
    }
}

// ---------------------------------------------------------------------------
// ScopeFilter
// ---------------------------------------------------------------------------

/// Combined include/exclude scope of one rule.
///
/// A file is in scope when it matches `include` (if any) and does not match
/// `exclude` (if any); exclude wins when both match.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    root: PathBuf,
    include: Option<PatternSet>,
    exclude: Option<PatternSet>,
    active: bool,
}

impl ScopeFilter {
    /// Build a filter rooted at `root`. `aliases` are extra spellings of the
    /// root that patterns may be prefixed with.
    pub fn new(
        include: Option<&[String]>,
        exclude: Option<&[String]>,
        root: &Path,
        aliases: &[&Path],
    ) -> Result<Self, SyncError> {
        let mut prefixes = vec![prefix_of(root)];
        prefixes.extend(aliases.iter().map(|alias| prefix_of(alias)));

        let include = match include {
            Some(patterns) => PatternSet::compile_with_prefixes(patterns, &prefixes)?,
            None => None,
        };
        let exclude = match exclude {
            Some(patterns) => PatternSet::compile_with_prefixes(patterns, &prefixes)?,
            None => None,
        };

        let active = include.is_some() || exclude.is_some();
        Ok(ScopeFilter {
            root: root.to_path_buf(),
            include,
            exclude,
            active,
        })
    }

    /// Filter for `rule`. Directory rules are rooted at the source directory,
    /// single-file rules at the source file's parent. `source_root` is the
    /// checkout the rule was resolved against, so patterns may also carry the
    /// configured (unresolved) source as a prefix.
    pub fn for_rule(
        rule: &FileRule,
        is_directory: bool,
        source_root: Option<&Path>,
    ) -> Result<Self, SyncError> {
        let root = if is_directory {
            rule.source.clone()
        } else {
            rule.source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        };
        let configured = source_root.and_then(|sr| root.strip_prefix(sr).ok());
        let aliases: Vec<&Path> = configured.into_iter().collect();

        let mut filter = Self::new(
            rule.include.as_deref(),
            rule.exclude.as_deref(),
            &root,
            &aliases,
        )?;
        filter.active |= rule.has_filters();
        Ok(filter)
    }

    /// Whether the rule declared include or exclude patterns at all.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scope test for a filesystem path. Directories and paths outside the
    /// root are always in scope.
    pub fn in_scope(&self, candidate: &Path) -> bool {
        if candidate.is_dir() {
            return true;
        }
        match relative_to(&self.root, candidate) {
            Some(relative) => self.in_scope_relative(&relative),
            None => true,
        }
    }

    /// Scope test for an already root-relative `/`-separated path.
    pub fn in_scope_relative(&self, relative: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .map_or(true, |set| set.matches(relative));
        let excluded = self
            .exclude
            .as_ref()
            .map_or(false, |set| set.matches(relative));
        included && !excluded
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
