//! Domain types for reposync.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Rules are serializable so `reposync rules --json` can print them as parsed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Host assumed when a repository name carries no URL prefix.
pub const DEFAULT_HOST: &str = "github.com";

/// Branch placeholder meaning "whatever the repository's default branch is".
pub const DEFAULT_BRANCH: &str = "default";

// ---------------------------------------------------------------------------
// RepoInfo
// ---------------------------------------------------------------------------

/// A target repository parsed from `[https://host/]user/name[@branch]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoInfo {
    pub host: String,
    pub user: String,
    pub name: String,
    pub branch: String,
}

impl RepoInfo {
    /// `host/user/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}/{}", self.host, self.user, self.name)
    }

    /// `host/user/name@branch`: one entry per (repository, branch) pair.
    pub fn unique_name(&self) -> String {
        format!("{}@{}", self.full_name(), self.branch)
    }

    /// `https://host/user/name`
    pub fn url(&self) -> String {
        format!("https://{}", self.full_name())
    }

    /// Local checkout of this repository under `workdir`:
    /// `<workdir>/<host>/<user>/<name>@<branch>`.
    pub fn checkout_dir(&self, workdir: &Path) -> PathBuf {
        workdir
            .join(&self.host)
            .join(&self.user)
            .join(format!("{}@{}", self.name, self.branch))
    }
}

impl fmt::Display for RepoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unique_name())
    }
}

impl FromStr for RepoInfo {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let invalid = |reason: &str| ConfigError::InvalidRepo {
            value: value.to_string(),
            reason: reason.to_string(),
        };
        if value.is_empty() {
            return Err(invalid("repository name is empty"));
        }

        let (host, rest) = match value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"))
        {
            Some(stripped) => {
                let (host, path) = stripped
                    .split_once('/')
                    .ok_or_else(|| invalid("URL has no repository path"))?;
                (host.to_string(), path.trim_start_matches('/'))
            }
            None => (DEFAULT_HOST.to_string(), value),
        };

        let (path, branch) = match rest.split_once('@') {
            Some((path, branch)) if !branch.trim().is_empty() => (path, branch.trim()),
            Some((path, _)) => (path, DEFAULT_BRANCH),
            None => (rest, DEFAULT_BRANCH),
        };
        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        let mut parts = path.split('/');
        let user = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("missing user"))?;
        let name = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("expected user/name"))?;
        if parts.next().is_some() {
            return Err(invalid("expected user/name"));
        }

        Ok(RepoInfo {
            host,
            user: user.to_string(),
            name: name.to_string(),
            branch: branch.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// TemplateSetting
// ---------------------------------------------------------------------------

/// Whether (and with which variables) a rule renders its files.
///
/// In YAML this is `false`, `true`, or a mapping of variables.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TemplateSetting {
    #[default]
    Disabled,
    /// Render with the implicit `repo` context only.
    Enabled,
    /// Render with these variables plus the implicit `repo` context.
    WithVars(Map<String, Value>),
}

impl TemplateSetting {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, TemplateSetting::Disabled)
    }

    /// Variables declared by the rule; empty for `true`.
    pub fn vars(&self) -> Map<String, Value> {
        match self {
            TemplateSetting::WithVars(vars) => vars.clone(),
            _ => Map::new(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawTemplateSetting {
    Flag(bool),
    Vars(Map<String, Value>),
}

impl Serialize for TemplateSetting {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = match self {
            TemplateSetting::Disabled => RawTemplateSetting::Flag(false),
            TemplateSetting::Enabled => RawTemplateSetting::Flag(true),
            TemplateSetting::WithVars(vars) => RawTemplateSetting::Vars(vars.clone()),
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TemplateSetting {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawTemplateSetting::deserialize(deserializer)? {
            RawTemplateSetting::Flag(false) => TemplateSetting::Disabled,
            RawTemplateSetting::Flag(true) => TemplateSetting::Enabled,
            RawTemplateSetting::Vars(vars) => TemplateSetting::WithVars(vars),
        })
    }
}

// ---------------------------------------------------------------------------
// FileRule
// ---------------------------------------------------------------------------

/// One source → destination synchronization directive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRule {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub template: TemplateSetting,
    /// When false an existing destination file is never overwritten.
    pub replace: bool,
    pub delete_orphaned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

impl FileRule {
    /// A plain copy rule with default settings.
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        FileRule {
            source: source.into(),
            dest: dest.into(),
            template: TemplateSetting::Disabled,
            replace: true,
            delete_orphaned: false,
            include: None,
            exclude: None,
        }
    }

    pub fn has_filters(&self) -> bool {
        self.include.is_some() || self.exclude.is_some()
    }

    /// Copy of this rule with `source` joined onto `source_root` and `dest`
    /// joined onto `dest_root`.
    pub fn resolve(&self, source_root: &Path, dest_root: &Path) -> FileRule {
        FileRule {
            source: source_root.join(&self.source),
            dest: dest_root.join(&self.dest),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
