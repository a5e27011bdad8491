//! Tests for `gpass init`.

use crate::support::*;

#[test]
fn test_init_creates_store_and_config() {
    let t = Test::new();
    let output = t.init_cmd("", &t.store_path(""));

    assert_success(&output);
    assert_stdout_contains(&output, "initialized root store");
    assert!(t.store_path("").join(".plain-ids").is_file());

    let config = std::fs::read_to_string(t.config_dir().join("config")).unwrap();
    assert!(config.contains("[mounts]"));
    assert!(config.contains(&t.store_path("").display().to_string()));
}

#[test]
fn test_init_records_default_recipient() {
    let t = Test::new();
    assert_success(&t.init_cmd("", &t.store_path("")));

    let ids = std::fs::read_to_string(t.store_path("").join(".plain-ids")).unwrap();
    assert!(ids.lines().any(|l| l.trim() == whoami::username()));
}

#[test]
fn test_init_twice_fails() {
    let t = Test::init();
    let output = t.init_cmd("", &t.store_path("again"));

    assert_exit_code(&output, 13);
    assert_stderr_contains(&output, "already");
}

#[test]
fn test_init_explicit_recipients() {
    let t = Test::new();
    let output = t
        .cmd()
        .args(["init", "--crypto", "plain", "--storage", "fs", "--path"])
        .arg(t.store_path(""))
        .args(["alice@example.com", "bob@example.com"])
        .output()
        .unwrap();
    assert_success(&output);

    let ids = std::fs::read_to_string(t.store_path("").join(".plain-ids")).unwrap();
    assert!(ids.contains("alice@example.com"));
    assert!(ids.contains("bob@example.com"));
}

#[test]
fn test_unknown_crypto_rejected() {
    let t = Test::new();
    let output = t
        .cmd()
        .args(["init", "--crypto", "rot13", "--path"])
        .arg(t.store_path(""))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_stderr_contains(&output, "rot13");
}
