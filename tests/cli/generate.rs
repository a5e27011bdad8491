//! Tests for `gpass generate`.

use crate::support::*;

fn stored_password(t: &Test, name: &str) -> String {
    let output = t.password(name);
    assert_success(&output);
    stdout(&output).trim_end_matches('\n').to_string()
}

#[test]
fn test_generate_with_length() {
    let t = Test::init();
    let output = t.run(&["generate", "web/site", "16"]);
    assert_success(&output);
    assert_stdout_contains(&output, "generated password for web/site");

    let pw = stored_password(&t, "web/site");
    assert_eq!(pw.chars().count(), 16);
    assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
    // the printed password is the stored one
    assert_stdout_contains(&output, &pw);
}

#[test]
fn test_generate_default_length() {
    let t = Test::init();
    assert_success(&t.run(&["generate", "a"]));
    assert_eq!(stored_password(&t, "a").chars().count(), 24);
}

#[test]
fn test_generate_length_from_env() {
    let t = Test::init();
    let output = t
        .cmd()
        .env("GPASS_PW_DEFAULT_LENGTH", "10")
        .args(["generate", "a"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stored_password(&t, "a").chars().count(), 10);
}

#[test]
fn test_generate_length_from_config() {
    let t = Test::init();
    assert_success(&t.run(&["config", "set", "generate.length", "12"]));
    assert_success(&t.run(&["generate", "a"]));
    assert_eq!(stored_password(&t, "a").chars().count(), 12);
}

#[test]
fn test_generate_zero_length_rejected() {
    let t = Test::init();
    let output = t.run(&["generate", "a", "0"]);
    assert_exit_code(&output, 2);
    assert_exit_code(&t.show("a"), 10);
}

#[test]
fn test_generate_xkcd_words() {
    let t = Test::init();
    assert_success(&t.run(&["generate", "-g", "xkcd", "--sep", "-", "phrase"]));

    let pw = stored_password(&t, "phrase");
    let words: Vec<&str> = pw.split('-').collect();
    assert_eq!(words.len(), 4);
    assert!(words
        .iter()
        .all(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_lowercase())));
}

#[test]
fn test_generate_strict_symbols() {
    let t = Test::init();
    assert_success(&t.run(&["generate", "--strict", "--symbols", "a", "20"]));

    let pw = stored_password(&t, "a");
    assert_eq!(pw.chars().count(), 20);
    assert!(pw.chars().any(|c| c.is_ascii_uppercase()));
    assert!(pw.chars().any(|c| c.is_ascii_lowercase()));
    assert!(pw.chars().any(|c| c.is_ascii_digit()));
    assert!(pw.chars().any(|c| c.is_ascii_punctuation()));
}

#[test]
fn test_generate_into_key_keeps_password() {
    let t = Test::with_secrets(&[("a", "keep")]);
    assert_success(&t.run(&["generate", "a", "pin", "8"]));

    assert_eq!(stored_password(&t, "a"), "keep");
    let pin = t.run(&["show", "a", "pin"]);
    assert_success(&pin);
    assert_eq!(stdout(&pin).trim().chars().count(), 8);
}

#[test]
fn test_generate_existing_needs_force() {
    let t = Test::with_secrets(&[("a", "old")]);
    assert_exit_code(&t.run(&["generate", "a"]), 11);
    assert_eq!(stored_password(&t, "a"), "old");

    assert_success(&t.run(&["generate", "--force", "a", "30"]));
    assert_eq!(stored_password(&t, "a").chars().count(), 30);
}

#[test]
fn test_unknown_generator_rejected() {
    let t = Test::init();
    let output = t.run(&["generate", "-g", "dice", "a"]);
    assert_exit_code(&output, 2);
}
