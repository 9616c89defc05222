//! Smoke tests -- verify the binary runs and key subcommands exist.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("extratod")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains(
            "Monthly statement (extrato) generation service",
        ));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("extratod")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("extratod"));
}

#[test]
fn test_run_subcommand_exists() {
    Command::cargo_bin("extratod")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success();
}

#[test]
fn test_history_subcommand_exists() {
    Command::cargo_bin("extratod")
        .unwrap()
        .args(["history", "--help"])
        .assert()
        .success();
}

#[test]
fn test_show_subcommand_exists() {
    Command::cargo_bin("extratod")
        .unwrap()
        .args(["show", "--help"])
        .assert()
        .success();
}
