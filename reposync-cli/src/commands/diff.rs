//! `reposync diff`: show unified diffs for what sync would write or delete.

use anyhow::{Context, Result};
use clap::Args;

use reposync_sync::diff::diff_repository;

use super::{CheckoutArgs, ConfigArgs};

/// Arguments for `reposync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub checkout: CheckoutArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let configs = self.config.load()?;
        let settings = self.checkout.settings();

        for config in &configs {
            let result = diff_repository(&settings, config)
                .with_context(|| format!("diff failed for '{}'", config.repo))?;

            if result.skipped {
                println!("No checkout for '{}'.", result.repo);
                continue;
            }
            if result.diffs.is_empty() {
                println!("No differences for '{}'.", result.repo);
                continue;
            }

            for diff in result.diffs {
                print!("{}", diff.unified_diff);
                if !diff.unified_diff.ends_with('\n') {
                    println!();
                }
            }
        }

        Ok(())
    }
}
