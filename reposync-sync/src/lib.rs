//! # reposync-sync
//!
//! File synchronization and orphan reconciliation for destination checkouts.
//!
//! Call [`engine::sync_rule`] to apply one rule, [`sync_repository`] to apply
//! every rule of one repository and commit the result, or [`pipeline::run`]
//! to process a whole configuration.

pub mod diff;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod pipeline;
pub mod scanner;
pub mod writer;

pub use engine::{apply, sync_rule, ReconciliationContext, RuleReport};
pub use error::SyncError;
pub use matcher::{PatternSet, ScopeFilter};
pub use orchestrator::{
    default_tree, sync_repository, GitWorkingTree, PlainTree, RepoReport, WorkingTree,
};
pub use scanner::scan;
pub use writer::FileChange;
