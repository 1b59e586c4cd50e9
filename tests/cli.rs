use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("nest").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: nest <COMMAND>"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_start_help() {
    let mut cmd = Command::cargo_bin("nest").unwrap();
    cmd.arg("start")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: nest start"))
        .stdout(predicate::str::contains("--api-key <API_KEY>"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("--session <SESSIONS>"))
        .stdout(predicate::str::contains("--protect <PROTECTED_PREFIXES>"));
}

#[test]
fn test_missing_api_key_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("nest").unwrap();
    // Run outside the crate so no .env file can supply the key.
    cmd.current_dir(dir.path())
        .env_remove("GEMINI_API_KEY")
        .arg("start")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--api-key <API_KEY>"));
}

#[test]
fn test_empty_api_key_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("nest").unwrap();
    cmd.current_dir(dir.path())
        .env("GEMINI_API_KEY", "")
        .arg("start")
        .assert()
        .failure();
}

#[test]
fn test_cli_no_command() {
    let mut cmd = Command::cargo_bin("nest").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage: nest <COMMAND>"));
}
