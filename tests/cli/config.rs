//! Tests for `gpass config`.

use crate::support::*;

#[test]
fn test_get_default_value() {
    let t = Test::init();
    let output = t.run(&["config", "get", "audit.hibp-endpoint"]);
    assert_success(&output);
    assert_eq!(
        stdout(&output).trim(),
        "https://api.pwnedpasswords.com/range/"
    );
}

#[test]
fn test_set_then_get() {
    let t = Test::init();
    let output = t.run(&["config", "set", "core.autosync", "false"]);
    assert_success(&output);
    assert_stdout_contains(&output, "core.autosync = false (user)");

    let get = t.run(&["config", "get", "core.autosync"]);
    assert_eq!(stdout(&get).trim(), "false");
}

#[test]
fn test_ls_shows_levels() {
    let t = Test::init();
    assert_success(&t.run(&["config", "set", "generate.length", "30"]));

    let output = t.run(&["config", "ls"]);
    assert_success(&output);
    assert_stdout_contains(&output, "generate.length = 30  (user)");
    assert_stdout_contains(&output, "(default)");
}

#[test]
fn test_store_level_lives_in_the_store() {
    let t = Test::init();
    let output = t.run(&["config", "set", "--level", "store", "generate.length", "14"]);
    assert_success(&output);

    assert_success(&t.run(&["generate", "a"]));
    let pw = stdout(&t.password("a"));
    assert_eq!(pw.trim().chars().count(), 14);
}

#[test]
fn test_env_overrides_files() {
    let t = Test::init();
    assert_success(&t.run(&["config", "set", "generate.length", "30"]));

    let output = t
        .cmd()
        .env("GPASS_CONFIG_COUNT", "1")
        .env("GPASS_CONFIG_KEY_0", "generate.length")
        .env("GPASS_CONFIG_VALUE_0", "9")
        .args(["config", "get", "generate.length"])
        .output()
        .unwrap();
    assert_eq!(stdout(&output).trim(), "9");
}

#[test]
fn test_unknown_key_rejected() {
    let t = Test::init();
    assert_exit_code(&t.run(&["config", "set", "core.bogus", "1"]), 2);
    assert_exit_code(&t.run(&["config", "get", "core.bogus"]), 2);
}

#[test]
fn test_invalid_value_rejected() {
    let t = Test::init();
    assert_exit_code(&t.run(&["config", "set", "core.autosync", "maybe"]), 2);
}

#[test]
fn test_unknown_level_rejected() {
    let t = Test::init();
    assert_exit_code(
        &t.run(&["config", "set", "--level", "galaxy", "core.autosync", "true"]),
        2,
    );
}
