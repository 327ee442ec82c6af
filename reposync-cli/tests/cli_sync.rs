use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const CONFIG: &str = r#"
octo/widgets@main:
  - LICENSE
  - source: templates/README.md
    dest: README.md
    template: true
  - source: docs/
    dest: docs/
    deleteOrphaned: true
    exclude: |
      *.log
"#;

struct Workspace {
    tmp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let tmp = TempDir::new().expect("tmp");
        let ws = Workspace { tmp };
        ws.write_source("LICENSE", "MIT License\n");
        ws.write_source("templates/README.md", "# {{ repo.name }}\n");
        ws.write_source("docs/guide.md", "guide\n");
        ws.write_source("docs/build.log", "noise\n");
        fs::write(ws.config(), CONFIG).expect("write config");
        fs::create_dir_all(ws.checkout()).expect("mkdir checkout");
        ws
    }

    fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn config(&self) -> PathBuf {
        self.root().join("sync.yml")
    }

    fn source(&self) -> PathBuf {
        self.root().join("source")
    }

    fn workdir(&self) -> PathBuf {
        self.root().join("work")
    }

    fn checkout(&self) -> PathBuf {
        self.workdir().join("github.com/octo/widgets@main")
    }

    fn write_source(&self, rel: &str, content: &str) {
        let path = self.source().join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write source");
    }

    fn cmd(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("reposync"));
        cmd.arg(subcommand)
            .arg("--config")
            .arg(self.config());
        if subcommand != "rules" {
            cmd.arg("--source")
                .arg(self.source())
                .arg("--workdir")
                .arg(self.workdir());
        }
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn sync_writes_renders_and_prunes() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.checkout().join("docs")).expect("mkdir");
    fs::write(ws.checkout().join("docs/stale.md"), "stale\n").expect("write");
    fs::write(ws.checkout().join("docs/local.log"), "keep me\n").expect("write");

    ws.cmd("sync")
        .assert()
        .success()
        .stdout(contains("github.com/octo/widgets@main"))
        .stdout(contains("3 written, 1 deleted"));

    let checkout = ws.checkout();
    assert_eq!(fs::read_to_string(checkout.join("LICENSE")).expect("read"), "MIT License\n");
    assert_eq!(fs::read_to_string(checkout.join("README.md")).expect("read"), "# widgets\n");
    assert_eq!(fs::read_to_string(checkout.join("docs/guide.md")).expect("read"), "guide\n");
    assert!(!checkout.join("docs/stale.md").exists(), "orphan should be deleted");
    assert!(!checkout.join("docs/build.log").exists(), "excluded file should not be copied");
    assert!(checkout.join("docs/local.log").exists(), "excluded file should not be deleted");
}

#[test]
fn second_sync_has_nothing_to_do() {
    let ws = Workspace::new();
    ws.cmd("sync").assert().success();
    ws.cmd("sync")
        .assert()
        .success()
        .stdout(contains("nothing to do"));
}

#[test]
fn dry_run_writes_nothing() {
    let ws = Workspace::new();
    ws.cmd("sync")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("~  README.md"));

    assert!(!ws.checkout().join("LICENSE").exists());
    assert!(!ws.checkout().join("README.md").exists());
    assert!(!ws.checkout().join("docs").exists());
}

#[test]
fn missing_checkout_is_reported_not_fatal() {
    let ws = Workspace::new();
    fs::remove_dir_all(ws.checkout()).expect("rm checkout");
    ws.cmd("sync")
        .assert()
        .success()
        .stdout(contains("skipped"));
}

#[test]
fn broken_template_fails_with_non_zero_exit() {
    let ws = Workspace::new();
    ws.write_source("templates/README.md", "{{ unclosed\n");
    ws.cmd("sync")
        .assert()
        .failure()
        .stderr(contains("failed"))
        .stderr(contains("templates/README.md"));
    assert!(ws.checkout().join("LICENSE").exists(), "earlier rules still apply");
}

#[test]
fn unknown_repo_filter_is_an_error() {
    let ws = Workspace::new();
    ws.cmd("sync")
        .args(["--repo", "octo/nope"])
        .assert()
        .failure()
        .stderr(contains("octo/nope"));
}

#[test]
fn missing_config_is_an_error() {
    let ws = Workspace::new();
    fs::remove_file(ws.config()).expect("rm config");
    ws.cmd("sync")
        .assert()
        .failure()
        .stderr(contains("failed to load sync config"));
}

#[test]
fn rules_lists_parsed_rules() {
    let ws = Workspace::new();
    ws.cmd("rules")
        .assert()
        .success()
        .stdout(contains("github.com/octo/widgets@main"))
        .stdout(contains("templates/README.md"))
        .stdout(contains("*.log"));
}

#[test]
fn rules_json_is_machine_readable() {
    let ws = Workspace::new();
    let output = ws.cmd("rules").arg("--json").output().expect("run");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json[0]["repo"]["user"], "octo");
    assert_eq!(json[0]["rules"][1]["template"], true);
    assert_eq!(json[0]["rules"][2]["deleteOrphaned"], true);
}

#[test]
fn diff_shows_pending_changes_without_writing() {
    let ws = Workspace::new();
    fs::write(ws.checkout().join("LICENSE"), "Old License\n").expect("write");

    ws.cmd("diff")
        .assert()
        .success()
        .stdout(contains("--- a/LICENSE"))
        .stdout(contains("+MIT License"))
        .stdout(contains("+++ b/README.md"))
        .stdout(contains("+# widgets"))
        .stdout(contains("build.log").not());

    assert_eq!(
        fs::read_to_string(ws.checkout().join("LICENSE")).expect("read"),
        "Old License\n"
    );
}

#[test]
fn diff_after_sync_is_clean() {
    let ws = Workspace::new();
    ws.cmd("sync").assert().success();
    ws.cmd("diff")
        .assert()
        .success()
        .stdout(contains("No differences"));
}
