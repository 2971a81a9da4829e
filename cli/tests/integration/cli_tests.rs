//! Integration tests for argument parsing and failures before any server work.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A bunkr process isolated from the user's config file.
fn bunkr() -> (Command, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bunkr"));
    cmd.env("NO_COLOR", "1")
        .env("BUNKR_CONFIG", dir.path().join("config.yaml"))
        .env_remove("BUNKR_ON")
        .env_remove("BUNKR_RECIPES_URL")
        .env_remove("RUST_LOG");
    (cmd, dir)
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// --- Help and version ---

#[test]
fn test_no_args_shows_help_and_exits_two() {
    let (mut cmd, _dir) = bunkr();
    cmd.assert().code(2).stderr(predicate::str::contains(
        "Harden a VPS and deploy self-hosted apps in one command",
    ));
}

#[test]
fn test_help_lists_every_command() {
    let (mut cmd, _dir) = bunkr();
    let output = cmd.arg("--help").output().expect("run bunkr");
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for name in [
        "init",
        "install",
        "list",
        "status",
        "update",
        "uninstall",
        "self-update",
        "version",
    ] {
        assert!(help.contains(name), "help is missing {name}:\n{help}");
    }
}

#[test]
fn test_version_flag() {
    let (mut cmd, _dir) = bunkr();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bunkr"));
}

#[test]
fn test_version_command() {
    let (mut cmd, _dir) = bunkr();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "bunkr {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json() {
    let (mut cmd, _dir) = bunkr();
    let output = cmd
        .args(["version", "--json"])
        .output()
        .expect("run bunkr");
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output)["version"],
        env!("CARGO_PKG_VERSION")
    );
}

#[test]
fn test_quiet_version_prints_nothing() {
    let (mut cmd, _dir) = bunkr();
    cmd.args(["-q", "version"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// --- Argument errors ---

#[test]
fn test_install_requires_a_recipe() {
    let (mut cmd, _dir) = bunkr();
    cmd.arg("install")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("<RECIPE>"));
}

#[test]
fn test_update_requires_a_recipe() {
    let (mut cmd, _dir) = bunkr();
    cmd.arg("update").assert().code(2);
}

#[test]
fn test_invalid_ssh_port_is_rejected() {
    let (mut cmd, _dir) = bunkr();
    cmd.args(["init", "--ssh-port", "70000"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--ssh-port"));
}

#[test]
fn test_malformed_preset_fails_before_connecting() {
    let (mut cmd, _dir) = bunkr();
    cmd.args([
        "install",
        "ghost",
        "--set",
        "DOMAIN",
        "--on",
        "root@203.0.113.10",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains(
        "invalid --set value 'DOMAIN': expected KEY=VALUE",
    ));
}

#[test]
fn test_invalid_target() {
    let (mut cmd, _dir) = bunkr();
    cmd.args(["status", "--on", "root@host:99999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid target 'root@host:99999'"));
}

#[test]
fn test_invalid_target_json_error() {
    let (mut cmd, _dir) = bunkr();
    let output = cmd
        .args(["status", "--json", "--on", "@host"])
        .output()
        .expect("run bunkr");
    assert!(!output.status.success());
    let err = stdout_json(&output);
    assert_eq!(err["error"], true);
    assert_eq!(err["code"], "transport");
    assert!(
        err["message"]
            .as_str()
            .expect("message")
            .contains("invalid target")
    );
}

#[test]
fn test_unreachable_recipe_index() {
    let (mut cmd, _dir) = bunkr();
    let output = cmd
        .args(["list", "--json", "--recipes-url", "http://127.0.0.1:9"])
        .output()
        .expect("run bunkr");
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["code"], "recipe");
}

// --- Config file ---

#[test]
fn test_unparsable_config_is_reported() {
    let (mut cmd, dir) = bunkr();
    std::fs::write(dir.path().join("config.yaml"), "ssh_port: [not a port\n")
        .expect("write config");
    cmd.arg("version")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse"));
}

#[test]
fn test_unsafe_admin_user_is_rejected_before_connecting() {
    let (mut cmd, dir) = bunkr();
    std::fs::write(
        dir.path().join("config.yaml"),
        "admin_user: \"ops; touch /tmp/x\"\n",
    )
    .expect("write config");
    let output = cmd
        .args(["init", "--json", "--on", "root@203.0.113.10"])
        .output()
        .expect("run bunkr");
    assert!(!output.status.success());
    let err = stdout_json(&output);
    assert_eq!(err["code"], "config");
    assert!(
        err["message"]
            .as_str()
            .expect("message")
            .contains("invalid admin_user 'ops; touch /tmp/x'")
    );
}
