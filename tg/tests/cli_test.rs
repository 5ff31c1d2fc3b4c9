//! CLI smoke tests for the `tg` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `tg` command isolated from the user's config and data directories
fn tg(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tg").expect("tg binary should build");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"));
    cmd
}

fn write_config(home: &TempDir, body: &str) -> std::path::PathBuf {
    let path = home.path().join("taskgate.yml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    tg(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("console"))
        .stdout(predicate::str::contains("Logs are written to"));
}

#[test]
fn test_config_prints_defaults() {
    let home = TempDir::new().unwrap();
    tg(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max-workers"))
        .stdout(predicate::str::contains("kai: 2"))
        .stdout(predicate::str::contains("poll-interval-ms: 1000"));
}

#[test]
fn test_config_rejects_zero_limit() {
    let home = TempDir::new().unwrap();
    let path = write_config(&home, "scheduler:\n  max-workers:\n    kai: 0\n");
    tg(&home).arg("--config").arg(&path).arg("config").assert().failure();
}

#[test]
fn test_run_batch_completes() {
    let home = TempDir::new().unwrap();
    let events = home.path().join("events.jsonl");
    let path = write_config(
        &home,
        &format!(
            "scheduler:\n  poll-interval-ms: 50\nexecutors:\n  kai:\n    simulate-ms: 20\n  kantra:\n    simulate-ms: 20\nevents:\n  log-path: {}\n",
            events.display()
        ),
    );

    tg(&home)
        .arg("--config")
        .arg(&path)
        .args(["run", "--kai", "3", "--kantra", "2", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_completed\": 5"));

    let log = std::fs::read_to_string(&events).unwrap();
    assert_eq!(log.lines().filter(|l| l.contains("\"Completed\"")).count(), 5);
}

#[test]
fn test_run_reports_failures() {
    let home = TempDir::new().unwrap();
    let path = write_config(
        &home,
        &format!(
            "executors:\n  kantra:\n    binary: \"false\"\nevents:\n  log-path: {}\n",
            home.path().join("events.jsonl").display()
        ),
    );

    tg(&home)
        .arg("--config")
        .arg(&path)
        .args(["run", "--kantra", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 task(s) failed"));
}

#[test]
fn test_run_batch_larger_than_event_capacity() {
    let home = TempDir::new().unwrap();
    let path = write_config(
        &home,
        &format!(
            "scheduler:\n  max-workers:\n    kai: 8\n    kantra: 2\nexecutors:\n  kai:\n    simulate-ms: 1\nevents:\n  capacity: 8\n  log-path: {}\n",
            home.path().join("events.jsonl").display()
        ),
    );

    tg(&home)
        .arg("--config")
        .arg(&path)
        .args(["run", "--kai", "300", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_completed\": 300"));
}
