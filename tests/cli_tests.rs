//! Binary-level tests for top-level CLI behavior.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn kgate() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("kgate"))
}

#[test]
fn test_help_is_accessible() {
    kgate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("connect"));
}

#[test]
fn test_no_arguments_shows_help_with_usage_exit_code() {
    kgate().assert().failure().code(2);
}

#[test]
fn test_unknown_subcommand_is_a_usage_error() {
    kgate().arg("frobnicate").assert().failure().code(2);
}

#[test]
fn test_version_subcommand_prints_package_version() {
    kgate()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_flag_matches_subcommand() {
    kgate()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
