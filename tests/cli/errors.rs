//! Tests for error handling, exit codes and global flags.

use predicates::prelude::*;

use crate::support::*;

#[test]
fn test_help() {
    Test::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_version_flag() {
    Test::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gpass"));
}

#[test]
fn test_unknown_command_fails() {
    let t = Test::new();
    assert_exit_code(&t.run(&["unknown-command"]), 2);
}

#[test]
fn test_uninitialized_hints_init() {
    Test::new()
        .cmd()
        .args(["show", "anything"])
        .assert()
        .code(40)
        .stderr(predicate::str::contains("gpass init"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let t = Test::init();
    let output = t.run(&["--verbose", "ls"]);
    assert_success(&output);
    assert_stderr_contains(&output, "DEBUG");
}

#[test]
fn test_json_logs() {
    let t = Test::init();
    let output = t
        .cmd()
        .env("GPASS_LOG", "gpass=debug")
        .args(["--log-json", "ls"])
        .output()
        .unwrap();
    assert_success(&output);

    let first = stderr(&output)
        .lines()
        .find(|l| l.starts_with('{'))
        .map(str::to_string)
        .expect("no json log line");
    let line: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(line["level"], "DEBUG");
    assert!(line["fields"].is_object());
}

#[test]
fn test_quiet_by_default() {
    let t = Test::with_secrets(&[("a", "1")]);
    let output = t.password("a");
    assert_success(&output);
    assert!(stderr(&output).is_empty(), "unexpected stderr: {}", stderr(&output));
}

#[test]
fn test_history_without_rcs() {
    let t = Test::with_secrets(&[("a", "1")]);
    let output = t.run(&["history", "a"]);
    assert!(!output.status.success());
}

#[test]
fn test_fsck_clean_store() {
    let t = Test::with_secrets(&[("a", "1"), ("web/b", "2")]);
    let output = t.run(&["fsck"]);
    assert_success(&output);
}

#[test]
fn test_fsck_json() {
    let t = Test::with_secrets(&[("a", "1")]);
    let output = t.run(&["fsck", "--json"]);
    assert_success(&output);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(json.is_array());
}

#[test]
fn test_recipients_ls() {
    let t = Test::init();
    let output = t.run(&["recipients", "ls"]);
    assert_success(&output);
    assert_stdout_contains(&output, &whoami::username());
}

#[test]
fn test_sync_offline() {
    let t = Test::with_secrets(&[("a", "1")]);
    let output = t.run(&["--no-network", "sync"]);
    assert_success(&output);
}
