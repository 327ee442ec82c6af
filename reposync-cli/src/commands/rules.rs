//! `reposync rules`: list the rules parsed from the sync config.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use reposync_core::{FileRule, RepoConfig, TemplateSetting};

use super::ConfigArgs;

/// Arguments for `reposync rules`.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl RulesArgs {
    pub fn run(self) -> Result<()> {
        let configs = self.config.load()?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&configs).context("failed to serialize rules JSON")?
            );
            return Ok(());
        }

        print_tables(&configs);
        Ok(())
    }
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "dest")]
    dest: String,
    #[tabled(rename = "template")]
    template: String,
    #[tabled(rename = "replace")]
    replace: bool,
    #[tabled(rename = "delete orphaned")]
    delete_orphaned: bool,
    #[tabled(rename = "include")]
    include: String,
    #[tabled(rename = "exclude")]
    exclude: String,
}

impl RuleRow {
    fn new(index: usize, rule: &FileRule) -> Self {
        RuleRow {
            index,
            source: rule.source.display().to_string(),
            dest: rule.dest.display().to_string(),
            template: template_label(&rule.template),
            replace: rule.replace,
            delete_orphaned: rule.delete_orphaned,
            include: patterns_label(rule.include.as_deref()),
            exclude: patterns_label(rule.exclude.as_deref()),
        }
    }
}

fn template_label(template: &TemplateSetting) -> String {
    match template {
        TemplateSetting::Disabled => "no".to_string(),
        TemplateSetting::Enabled => "yes".to_string(),
        TemplateSetting::WithVars(vars) => {
            let names: Vec<&str> = vars.keys().map(String::as_str).collect();
            format!("vars: {}", names.join(", "))
        }
    }
}

fn patterns_label(patterns: Option<&[String]>) -> String {
    match patterns {
        Some(patterns) => patterns.join("\n"),
        None => "-".to_string(),
    }
}

fn print_tables(configs: &[RepoConfig]) {
    if configs.is_empty() {
        println!("No repositories configured.");
        return;
    }

    for config in configs {
        println!(
            "{} ({} rules)",
            config.repo.unique_name().bold(),
            config.rules.len()
        );
        let rows: Vec<RuleRow> = config
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| RuleRow::new(index, rule))
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
}
