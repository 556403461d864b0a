//! Binary-level tests for `kgate connect`.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn kgate() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kgate"));
    cmd.env_remove("CLOUDSDK_CORE_PROJECT")
        .env_remove("CLOUDSDK_COMPUTE_ZONE");
    cmd
}

#[test]
fn test_connect_help_is_accessible() {
    kgate().args(["connect", "--help"]).assert().success();
}

#[test]
fn test_missing_project_and_zone_is_a_usage_error() {
    kgate()
        .args(["connect", "--", "true"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--project"));
}

#[test]
fn test_project_and_zone_accepted_from_ambient_environment() {
    // With ambient config present the usage check passes; the command then
    // fails later (no gcloud on the emptied PATH), not with a usage error.
    let empty_path = tempfile::TempDir::new().expect("tempdir");
    kgate()
        .args(["connect", "--", "true"])
        .env("CLOUDSDK_CORE_PROJECT", "acme")
        .env("CLOUDSDK_COMPUTE_ZONE", "us-central1-a")
        .env("PATH", empty_path.path())
        .assert()
        .failure()
        .code(predicate::ne(2));
}

#[test]
fn test_missing_client_command_is_a_usage_error() {
    kgate()
        .args([
            "connect",
            "--project",
            "acme",
            "--zone",
            "us-central1-a",
        ])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_unavailable_cloud_cli_is_not_a_usage_error() {
    let empty_path = tempfile::TempDir::new().expect("tempdir");
    kgate()
        .args([
            "connect",
            "--project",
            "acme",
            "--zone",
            "us-central1-a",
            "--",
            "true",
        ])
        .env("PATH", empty_path.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("gcloud"));
}
