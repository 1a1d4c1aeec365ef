//! CLI integration tests for `procflow check`.
//!
//! Uses `assert_cmd` to spawn the `procflow` binary and verify exit codes,
//! stdout content and stderr content.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const VALID_CONFIG: &str = r#"
processes:
  - name: requests
    statuses:
      - name: open
        next: [in_progress, rejected]
      - name: in_progress
        next: [open, rejected, done]
      - name: rejected
      - name: done
        schema: '{"type": "object", "required": ["reason"]}'
  - name: orders
    statuses:
      - name: draft
        next: [placed]
      - name: imported
        initial: true
        next: [placed]
      - name: placed
"#;

/// Helper: write `content` to `name` inside a fresh temp dir.
fn write_config(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write config");
    (dir, path)
}

/// Helper: a `procflow` command isolated from the caller's environment.
fn procflow() -> Command {
    let mut cmd = cargo_bin_cmd!("procflow");
    cmd.env_remove("PROCFLOW_CONFIG").env_remove("RUST_LOG");
    cmd
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    procflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Process workflow engine"));
}

#[test]
fn version_exits_0() {
    procflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("procflow"));
}

// ──────────────────────────────────────────────
// 2. check
// ──────────────────────────────────────────────

#[test]
fn check_valid_yaml_config() {
    let (_dir, path) = write_config("config.yaml", VALID_CONFIG);
    procflow()
        .arg("--config")
        .arg(&path)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Process types: 2"))
        .stdout(predicate::str::contains("requests: 4 statuses, start: open"))
        .stdout(predicate::str::contains("orders: 3 statuses, start: imported"))
        .stdout(predicate::str::contains("Schemas compiled: 1"));
}

#[test]
fn check_json_output() {
    let (_dir, path) = write_config("config.yaml", VALID_CONFIG);
    let output = procflow()
        .args(["--output", "json", "check", "--config"])
        .arg(&path)
        .output()
        .expect("run procflow");
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON report");
    assert_eq!(report["valid"], true);
    assert_eq!(report["schemas"], 1);
    let names: Vec<&str> = report["process_types"]
        .as_array()
        .expect("process_types array")
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["orders", "requests"]);
}

#[test]
fn check_reads_config_from_env() {
    let (_dir, path) = write_config("procflow.json", r#"{"processes": [{"name": "tickets", "statuses": [{"name": "new"}]}]}"#);
    procflow()
        .env("PROCFLOW_CONFIG", &path)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("tickets: 1 statuses, start: new"));
}

#[test]
fn check_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    procflow()
        .arg("--config")
        .arg(dir.path().join("absent.json"))
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn check_empty_config_fails() {
    let (_dir, path) = write_config("config.json", "  \n");
    procflow()
        .arg("--config")
        .arg(&path)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty"));
}

#[test]
fn check_dangling_next_status_fails() {
    let (_dir, path) = write_config(
        "config.yaml",
        "processes:\n  - name: requests\n    statuses:\n      - name: open\n        next: [closed]\n",
    );
    procflow()
        .arg("--config")
        .arg(&path)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid process config"))
        .stderr(predicate::str::contains("closed"));
}

#[test]
fn check_invalid_schema_fails() {
    let (_dir, path) = write_config(
        "config.json",
        r#"{"processes": [{"name": "requests", "statuses": [{"name": "open", "schema": {"type": 42}}]}]}"#,
    );
    procflow()
        .arg("--config")
        .arg(&path)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid payload schema"));
}

#[test]
fn check_error_as_json() {
    let dir = TempDir::new().unwrap();
    let output = procflow()
        .args(["--output", "json", "check", "--config"])
        .arg(dir.path().join("absent.json"))
        .output()
        .expect("run procflow");
    assert!(!output.status.success());
    let err: serde_json::Value =
        serde_json::from_slice(&output.stderr).expect("JSON error on stderr");
    assert!(err["error"].as_str().unwrap().contains("failed to load config"));
}
