//! reposync core library: domain types, sync config parsing, run settings, errors.
//!
//! - [`types`]: [`FileRule`], [`TemplateSetting`], [`RepoInfo`]
//! - [`config`]: `.github/sync.yml` loading
//! - [`settings`]: [`SyncSettings`]
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod settings;
pub mod types;

pub use config::RepoConfig;
pub use error::ConfigError;
pub use settings::SyncSettings;
pub use types::{FileRule, RepoInfo, TemplateSetting};
