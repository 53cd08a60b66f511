//! CLI smoke tests for the `tc` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `tc` with its data, logs and store confined to a temp dir
fn tc(dir: &TempDir) -> Command {
    let config = dir.path().join("taskchat.yml");
    if !config.exists() {
        let store = dir.path().join("store");
        std::fs::write(&config, format!("storage:\n  store-dir: {}\n", store.display())).unwrap();
    }

    let mut cmd = Command::cargo_bin("tc").unwrap();
    cmd.env("HOME", dir.path())
        .env("XDG_DATA_HOME", dir.path().join("data"))
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .arg("--config")
        .arg(&config)
        .arg("--user")
        .arg("alice");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("tc")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("upcoming"));
}

#[test]
fn test_add_then_list_as_json() {
    let dir = TempDir::new().unwrap();

    tc(&dir)
        .args(["add", "water the plants"])
        .assert()
        .success()
        .stdout(predicate::str::contains("water the plants"));

    tc(&dir)
        .args(["list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"origin\": \"direct-api\""));
}

#[test]
fn test_empty_text_is_rejected() {
    let dir = TempDir::new().unwrap();

    tc(&dir)
        .args(["add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("task text cannot be empty"));
}

#[test]
fn test_upcoming_with_no_tasks() {
    let dir = TempDir::new().unwrap();

    tc(&dir)
        .args(["upcoming", "--days", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("You have no tasks due in the next 3 days."));
}
