//! Sync configuration file (`.github/sync.yml`).
//!
//! # Layout
//!
//! ```yaml
//! octo/widgets@main:
//!   - LICENSE
//!   - source: templates/
//!     dest: .github/templates/
//!     template:
//!       team: platform
//!     deleteOrphaned: true
//!     exclude: |
//!       *.log
//!
//! group:
//!   - repos: |
//!       octo/a
//!       octo/b@dev
//!     files:
//!       - source: .editorconfig
//! ```
//!
//! Every top-level key other than `group` names one repository. Repositories
//! that appear several times accumulate rules in order of appearance.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::ConfigError;
use crate::types::{FileRule, RepoInfo, TemplateSetting};

/// Reserved top-level key holding repository groups.
pub const GROUP_KEY: &str = "group";

/// Config path used when none is given.
pub const DEFAULT_CONFIG_PATH: &str = ".github/sync.yml";

// ---------------------------------------------------------------------------
// Parsed output
// ---------------------------------------------------------------------------

/// All rules targeting one repository, in configuration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoConfig {
    pub repo: RepoInfo,
    pub rules: Vec<FileRule>,
}

impl RepoConfig {
    /// True if `query` names this repository, either fully
    /// (`host/user/name@branch`, `host/user/name`) or as `user/name[@branch]`.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        let short = format!("{}/{}", self.repo.user, self.repo.name);
        query == self.repo.unique_name()
            || query == self.repo.full_name()
            || query == short
            || query == format!("{short}@{}", self.repo.branch)
    }
}

// ---------------------------------------------------------------------------
// Raw YAML shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lines {
    Text(String),
    List(Vec<String>),
}

impl Lines {
    /// Multi-line strings split on newlines; blank lines dropped.
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            Lines::Text(text) => text.lines().map(str::to_string).collect(),
            Lines::List(list) => list,
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRule {
    source: String,
    #[serde(default)]
    dest: Option<String>,
    #[serde(default)]
    template: Option<TemplateSetting>,
    #[serde(default)]
    replace: Option<bool>,
    #[serde(default)]
    delete_orphaned: Option<bool>,
    #[serde(default)]
    include: Option<Lines>,
    #[serde(default)]
    exclude: Option<Lines>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGroup {
    repos: Lines,
    files: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Load and parse the sync config at `path`.
pub fn load(path: &Path) -> Result<Vec<RepoConfig>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_str(&contents, path)
}

/// Parse sync config YAML. `origin` is only used for error messages.
pub fn parse_str(contents: &str, origin: &Path) -> Result<Vec<RepoConfig>, ConfigError> {
    let parse_err = |e| ConfigError::Parse {
        path: origin.to_path_buf(),
        source: e,
    };
    let root: Value = serde_yaml::from_str(contents).map_err(parse_err)?;

    let mapping = match root {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(vec![]),
        _ => {
            return Err(ConfigError::InvalidEntry {
                repo: origin.display().to_string(),
                reason: "top level must be a mapping of repositories".to_string(),
            })
        }
    };

    let mut configs: Vec<RepoConfig> = Vec::new();
    for (key, value) in mapping {
        let key = key.as_str().ok_or_else(|| ConfigError::InvalidRepo {
            value: format!("{key:?}"),
            reason: "repository keys must be strings".to_string(),
        })?;

        if key == GROUP_KEY {
            let groups: Vec<RawGroup> = match value {
                Value::Sequence(_) => serde_yaml::from_value(value).map_err(parse_err)?,
                other => vec![serde_yaml::from_value(other).map_err(parse_err)?],
            };
            for group in groups {
                let repos = group.repos.into_vec();
                for name in repos.iter().flat_map(|line| line.split(',')) {
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    let repo: RepoInfo = name.parse()?;
                    let rules = parse_entries(&repo, &group.files)?;
                    merge(&mut configs, repo, rules);
                }
            }
            continue;
        }

        let repo: RepoInfo = key.parse()?;
        let entries = match value {
            Value::Sequence(entries) => entries,
            Value::Null => vec![],
            _ => {
                return Err(ConfigError::InvalidEntry {
                    repo: repo.unique_name(),
                    reason: "expected a list of files".to_string(),
                })
            }
        };
        let rules = parse_entries(&repo, &entries)?;
        merge(&mut configs, repo, rules);
    }

    Ok(configs)
}

fn merge(configs: &mut Vec<RepoConfig>, repo: RepoInfo, rules: Vec<FileRule>) {
    let config = match configs.iter().position(|c| c.repo == repo) {
        Some(idx) => &mut configs[idx],
        None => {
            configs.push(RepoConfig {
                repo,
                rules: Vec::new(),
            });
            let last = configs.len() - 1;
            &mut configs[last]
        }
    };
    for rule in rules {
        if !config.rules.contains(&rule) {
            config.rules.push(rule);
        }
    }
}

fn parse_entries(repo: &RepoInfo, entries: &[Value]) -> Result<Vec<FileRule>, ConfigError> {
    entries.iter().map(|entry| parse_entry(repo, entry)).collect()
}

fn parse_entry(repo: &RepoInfo, entry: &Value) -> Result<FileRule, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEntry {
        repo: repo.unique_name(),
        reason,
    };

    match entry {
        Value::String(path) => {
            let path = path.trim();
            if path.is_empty() {
                return Err(invalid("empty file path".to_string()));
            }
            Ok(FileRule::new(path, path))
        }
        Value::Mapping(_) => {
            let raw: RawRule =
                serde_yaml::from_value(entry.clone()).map_err(|e| invalid(e.to_string()))?;
            let source = raw.source.trim().to_string();
            if source.is_empty() {
                return Err(invalid("`source` must not be empty".to_string()));
            }
            let dest = raw
                .dest
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| source.clone());
            Ok(FileRule {
                source: PathBuf::from(source),
                dest: PathBuf::from(dest),
                template: raw.template.unwrap_or_default(),
                replace: raw.replace.unwrap_or(true),
                delete_orphaned: raw.delete_orphaned.unwrap_or(false),
                include: raw.include.map(Lines::into_vec),
                exclude: raw.exclude.map(Lines::into_vec),
            })
        }
        other => Err(invalid(format!(
            "expected a path or a mapping, got {other:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Vec<RepoConfig> {
        parse_str(yaml, Path::new("sync.yml")).expect("parse")
    }

    #[test]
    fn string_entry_uses_same_source_and_dest() {
        let configs = parse("octo/widgets:\n  - LICENSE\n");
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].rules, vec![FileRule::new("LICENSE", "LICENSE")]);
    }

    #[test]
    fn mapping_entry_defaults() {
        let configs = parse("octo/widgets:\n  - source: a.txt\n");
        let rule = &configs[0].rules[0];
        assert_eq!(rule.dest, PathBuf::from("a.txt"));
        assert!(rule.replace);
        assert!(!rule.delete_orphaned);
        assert_eq!(rule.template, TemplateSetting::Disabled);
        assert!(rule.include.is_none() && rule.exclude.is_none());
    }

    #[test]
    fn multiline_exclude_is_split_and_trimmed() {
        let yaml = "octo/widgets:\n  - source: dir/\n    exclude: |\n      *.log\n\n      tmp/\n";
        let configs = parse(yaml);
        assert_eq!(
            configs[0].rules[0].exclude,
            Some(vec!["*.log".to_string(), "tmp/".to_string()])
        );
    }

    #[test]
    fn unknown_field_is_rejected_with_repo_context() {
        let err = parse_str("octo/widgets:\n  - source: a\n    dst: b\n", Path::new("s.yml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry { .. }), "got: {err}");
        assert!(err.to_string().contains("github.com/octo/widgets@default"));
    }

    #[test]
    fn empty_document_has_no_repositories() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn matches_short_and_full_names() {
        let configs = parse("octo/widgets@dev:\n  - LICENSE\n");
        let config = &configs[0];
        assert!(config.matches("octo/widgets"));
        assert!(config.matches("octo/widgets@dev"));
        assert!(config.matches("github.com/octo/widgets@dev"));
        assert!(!config.matches("octo/gadgets"));
    }
}
