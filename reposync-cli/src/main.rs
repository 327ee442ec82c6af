//! reposync: keep files in target repositories in sync with a source repository.
//!
//! # Usage
//!
//! ```text
//! reposync sync [--config <path>] [--source <dir>] [--workdir <dir>] [--repo <name>]...
//!               [--dry-run] [--single-commit] [--commit-prefix <str>] [--no-autoescape]
//! reposync diff [--config <path>] [--source <dir>] [--workdir <dir>] [--repo <name>]...
//! reposync rules [--config <path>] [--repo <name>]... [--json]
//! ```
//!
//! Destination checkouts live at `<workdir>/<host>/<user>/<name>@<branch>`.

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use commands::{diff::DiffArgs, rules::RulesArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "reposync",
    version,
    about = "Sync files from a source repository into target repository checkouts",
    long_about = None,
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply every configured rule to each repository checkout and commit.
    Sync(SyncArgs),

    /// Show unified diffs of what sync would write or delete.
    Diff(DiffArgs),

    /// List the parsed rules per repository.
    Rules(RulesArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Rules(args) => args.run(),
    }
}
