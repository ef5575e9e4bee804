//! CLI 端到端测试（不需要终端的子命令）

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn cli() -> Command {
    Command::cargo_bin("pistage-cli").unwrap()
}

#[test]
fn test_attributes_uses_config_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[simulation]\ntravel_max_mm = 25.0\n").unwrap();

    cli()
        .args(["--config", path.to_str().unwrap(), "attributes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("position_um"))
        .stdout(predicate::str::contains("25000.000"))
        .stdout(predicate::str::contains("cmd_zero_reference_move"));
}

#[test]
fn test_config_show_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");

    cli()
        .args(["--config", path.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("log_filter = \"pistage=info\""))
        .stdout(predicate::str::contains("[simulation]"));
}

#[test]
fn test_config_path_echoes_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");

    cli()
        .args(["config", "path", "--config", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[simulation]\ntravel_min_mm = 60.0\n").unwrap();

    cli()
        .args(["--config", path.to_str().unwrap(), "attributes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("travel_min_mm"));
}

#[test]
fn test_shell_requires_controller() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    cli()
        .args(["--config", path.to_str().unwrap(), "shell"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("controller"));
}
