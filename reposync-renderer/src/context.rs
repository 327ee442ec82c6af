//! Template context: rule variables plus the implicit `repo` object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use reposync_core::types::RepoInfo;

use crate::error::RenderError;

/// Key under which repository metadata is exposed to every template.
pub const REPO_KEY: &str = "repo";

/// Repository metadata available to templates as `{{ repo.* }}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContext {
    pub host: String,
    pub user: String,
    pub name: String,
    pub branch: String,
    pub full_name: String,
    pub unique_name: String,
    pub url: String,
}

impl RepoContext {
    pub fn from_repo(repo: &RepoInfo) -> Self {
        RepoContext {
            host: repo.host.clone(),
            user: repo.user.clone(),
            name: repo.name.clone(),
            branch: repo.branch.clone(),
            full_name: repo.full_name(),
            unique_name: repo.unique_name(),
            url: repo.url(),
        }
    }
}

/// Rendering payload for one file: user variables and optional repo metadata
/// kept apart until the moment they are merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContext {
    pub vars: Map<String, Value>,
    pub repo: Option<RepoContext>,
}

impl TemplateContext {
    pub fn new(vars: Map<String, Value>, repo: Option<&RepoContext>) -> Self {
        TemplateContext {
            vars,
            repo: repo.cloned(),
        }
    }

    /// Merged JSON object. The implicit `repo` entry replaces a user variable
    /// of the same name.
    pub fn to_value(&self) -> Result<Value, RenderError> {
        let mut object = self.vars.clone();
        if let Some(repo) = &self.repo {
            if object.contains_key(REPO_KEY) {
                tracing::warn!(
                    "template variable `{REPO_KEY}` is shadowed by repository metadata"
                );
            }
            object.insert(REPO_KEY.to_string(), serde_json::to_value(repo)?);
        }
        Ok(Value::Object(object))
    }
}
