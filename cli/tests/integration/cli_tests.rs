//! Integration tests for the CLI surface: help, version, and startup errors.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn bluegreen() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tsuru-bluegreen"));
    cmd.env("NO_COLOR", "1")
        .env_remove("TSURU_BLUEGREEN_CONFIG")
        .env_remove("TSURU_TARGET")
        .env_remove("TSURU_TOKEN");
    cmd
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("tsuru-bluegreen.yaml");
    std::fs::write(&path, body).expect("write config");
    path
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    bluegreen()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Blue-green deploys on tsuru"));
}

#[test]
fn test_cli_help_lists_commands() {
    bluegreen()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("pre"))
        .stdout(predicate::str::contains("swap"))
        .stdout(predicate::str::contains("cname"));
}

#[test]
fn test_cli_help_mentions_yaml_migration() {
    bluegreen()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("YAML"))
        .stdout(predicate::str::contains("tsuru-bluegreen.ini"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    bluegreen()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!(
            "tsuru-bluegreen ",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_pre_help_shows_tag_default() {
    bluegreen()
        .args(["pre", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tag"))
        .stdout(predicate::str::contains("master"));
}

#[test]
fn test_unknown_command_fails() {
    bluegreen().arg("rollback").assert().code(2);
}

// --- Startup errors ---

#[test]
fn test_missing_config_file_exits_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    bluegreen()
        .current_dir(dir.path())
        .arg("swap")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_legacy_ini_config_exits_one_with_hint() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("tsuru-bluegreen.ini"), "[Application]\nname = web\n")
        .expect("write ini");
    bluegreen()
        .current_dir(dir.path())
        .arg("swap")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("convert it to YAML"));
}

// --- NO_COLOR ---

#[test]
fn test_no_color_accepts_any_value() {
    for value in ["1", "yes", "true", ""] {
        let dir = tempfile::tempdir().expect("tempdir");
        bluegreen()
            .current_dir(dir.path())
            .env("NO_COLOR", value)
            .arg("swap")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Configuration file not found"));
    }
}

#[test]
fn test_no_color_flag_still_works() {
    let dir = tempfile::tempdir().expect("tempdir");
    bluegreen()
        .env_remove("NO_COLOR")
        .current_dir(dir.path())
        .args(["--no-color", "swap"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_missing_target_env_exits_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(&dir, "application:\n  name: web\n");
    bluegreen()
        .arg("--config")
        .arg(&path)
        .env("TSURU_TOKEN", "token")
        .arg("cname")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("TSURU_TARGET"));
}

#[test]
fn test_missing_token_env_exits_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(&dir, "application:\n  name: web\n");
    bluegreen()
        .env("TSURU_BLUEGREEN_CONFIG", &path)
        .env("TSURU_TARGET", "tsuru.example.com")
        .arg("swap")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("TSURU_TOKEN"));
}

#[test]
fn test_config_without_app_name_exits_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_config(&dir, "retry:\n  times: 1\n");
    bluegreen()
        .current_dir(dir.path())
        .env("TSURU_TARGET", "tsuru.example.com")
        .env("TSURU_TOKEN", "token")
        .args(["pre", "--tag", "0.2.1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("application.name"));
}

#[test]
fn test_unreachable_control_plane_exits_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_config(&dir, "application:\n  name: web\n");
    bluegreen()
        .current_dir(dir.path())
        .env("TSURU_TARGET", "http://127.0.0.1:1")
        .env("TSURU_TOKEN", "token")
        .arg("cname")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}
