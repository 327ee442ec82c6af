//! Sync config loading: repositories, groups, rule normalization, error context.

use std::path::PathBuf;

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use reposync_core::{config, ConfigError, FileRule, TemplateSetting};
use serde_json::Value;

const SYNC_YML: &str = r#"
octo/widgets@main:
  - LICENSE
  - source: templates/
    dest: .github/templates/
    template:
      team: platform
      owners: [ada, grace]
    deleteOrphaned: true
    exclude: |
      *.log
      tmp/
  - source: README.md
    replace: false
    template: true

group:
  - repos: |
      octo/gadgets
      octo/widgets@main
    files:
      - source: .editorconfig
        include:
          - "**/*.md"
  - repos: [octo/gizmos@dev]
    files:
      - workflows/ci.yml
"#;

fn write_config(contents: &str) -> (assert_fs::TempDir, PathBuf) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(".github/sync.yml");
    file.write_str(contents).expect("write config");
    file.assert(predicate::path::exists());
    let path = file.path().to_path_buf();
    (dir, path)
}

#[test]
fn load_groups_and_repositories_in_order_of_appearance() {
    let (_dir, path) = write_config(SYNC_YML);
    let configs = config::load(&path).expect("load");

    let names: Vec<String> = configs.iter().map(|c| c.repo.unique_name()).collect();
    assert_eq!(
        names,
        vec![
            "github.com/octo/widgets@main",
            "github.com/octo/gadgets@default",
            "github.com/octo/gizmos@dev",
        ]
    );

    let widgets = &configs[0];
    assert_eq!(widgets.rules.len(), 4, "group rules are appended to the repo");
    assert_eq!(widgets.rules[3].source, PathBuf::from(".editorconfig"));
    assert_eq!(
        widgets.rules[3].include,
        Some(vec!["**/*.md".to_string()])
    );
}

#[test]
fn load_normalizes_rule_settings() {
    let (_dir, path) = write_config(SYNC_YML);
    let configs = config::load(&path).expect("load");
    let rules = &configs[0].rules;

    assert_eq!(rules[0], FileRule::new("LICENSE", "LICENSE"));

    let templates = &rules[1];
    assert_eq!(templates.dest, PathBuf::from(".github/templates/"));
    assert!(templates.delete_orphaned);
    assert_eq!(
        templates.exclude,
        Some(vec!["*.log".to_string(), "tmp/".to_string()])
    );
    match &templates.template {
        TemplateSetting::WithVars(vars) => {
            assert_eq!(vars["team"], Value::from("platform"));
            assert_eq!(vars["owners"][1], Value::from("grace"));
        }
        other => panic!("expected template vars, got {other:?}"),
    }

    let readme = &rules[2];
    assert!(!readme.replace);
    assert_eq!(readme.template, TemplateSetting::Enabled);
}

#[test]
fn duplicate_rules_from_groups_are_dropped() {
    let yaml = r#"
octo/widgets:
  - LICENSE
group:
  repos: octo/widgets
  files:
    - LICENSE
    - NOTICE
"#;
    let (_dir, path) = write_config(yaml);
    let configs = config::load(&path).expect("load");
    let sources: Vec<_> = configs[0].rules.iter().map(|r| r.source.clone()).collect();
    assert_eq!(sources, vec![PathBuf::from("LICENSE"), PathBuf::from("NOTICE")]);
}

#[test]
fn missing_config_returns_io_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("nope.yml");
    let err = config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("nope.yml"));
}

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let (_dir, path) = write_config(": : corrupt : yaml : !!!\n  - broken: [unclosed");
    let err = config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("sync.yml"));
}

#[test]
fn non_list_repository_value_is_rejected() {
    let (_dir, path) = write_config("octo/widgets: LICENSE\n");
    let err = config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEntry { .. }), "got: {err}");
}

#[test]
fn invalid_repository_key_is_rejected() {
    let (_dir, path) = write_config("widgets:\n  - LICENSE\n");
    let err = config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidRepo { .. }), "got: {err}");
}
