//! # reposync-renderer
//!
//! Tera-based rendering of template rules: one file in, rendered text out,
//! with the rule's variables and an implicit `repo` object in scope.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use reposync_renderer::{RepoContext, TemplateContext, TemplateEngine};
//! use serde_json::Map;
//!
//! fn render(path: &Path) -> Result<String, reposync_renderer::RenderError> {
//!     let repo = RepoContext::from_repo(&"octo/widgets@main".parse().expect("repo"));
//!     let ctx = TemplateContext::new(Map::new(), Some(&repo));
//!     TemplateEngine::default().render_file(path, &ctx)
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{RepoContext, TemplateContext};
pub use engine::TemplateEngine;
pub use error::RenderError;
