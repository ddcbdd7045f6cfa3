//! Command-line tests for the commands that need no model endpoint

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const SOURCE: &str = "\
import os

def load(path):
    with open(path) as f:
        return f.read()

class Store:
    def __init__(self, root):
        self.root = root

    def get(self, key):
        return load(os.path.join(self.root, key))
";

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("codebase-analysis").unwrap();
    cmd.env_remove("CODEBASE_ANALYSIS_CONFIG");
    cmd
}

#[test]
fn breakdown_lists_units() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("store.py");
    fs::write(&file, SOURCE).unwrap();

    cmd()
        .current_dir(dir.path())
        .arg("breakdown")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Functions (1):"))
        .stdout(predicate::str::contains("load"))
        .stdout(predicate::str::contains("Classes (1):"))
        .stdout(predicate::str::contains(".__init__"))
        .stdout(predicate::str::contains(".get"));
}

#[test]
fn breakdown_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("store.py");
    fs::write(&file, SOURCE).unwrap();

    let output = cmd()
        .current_dir(dir.path())
        .args(["--format", "json", "breakdown"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["functions"][0]["name"], "load");
    assert_eq!(json["classes"][0]["name"], "Store");
    assert_eq!(json["classes"][0]["methods"][1]["name"], "get");
}

#[test]
fn breakdown_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["breakdown", "absent.py"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read source file"));
}

#[test]
fn init_writes_config_and_database() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    assert!(dir.path().join("codebase-analysis.toml").exists());
    assert!(dir.path().join("codebase.db").exists());

    cmd()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn config_reads_file_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[retrieval]\nmax_context = 7\n").unwrap();

    cmd()
        .current_dir(dir.path())
        .env("CODEBASE_ANALYSIS_CONFIG", &config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Max context: 7"))
        .stdout(predicate::str::contains("Results per kind: 3"));
}

#[test]
fn status_before_init_fails() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("init"));
}
