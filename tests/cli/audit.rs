//! Tests for `gpass audit`.

use crate::support::*;

#[test]
fn test_weak_password_exits_with_findings() {
    let t = Test::with_secrets(&[("weak", "abc")]);
    let output = t.run(&["audit"]);

    assert_exit_code(&output, 3);
    assert_stdout_contains(&output, "weak");
    assert_stdout_contains(&output, "1 of 1 secrets have findings");
}

#[test]
fn test_clean_audit_succeeds() {
    let t = Test::with_secrets(&[("a", "x9#Tq!7vLm2@Rz"), ("b", "Wq8$eN3!kPz6&Lr")]);
    let output = t.run(&["audit"]);

    assert_success(&output);
    assert_stdout_contains(&output, "0 of 2 secrets have findings");
}

#[test]
fn test_duplicates_reported() {
    let t = Test::with_secrets(&[("a", "x9#Tq!7vLm2@Rz"), ("b", "x9#Tq!7vLm2@Rz")]);
    let output = t.run(&["audit"]);

    assert_exit_code(&output, 3);
    assert_stdout_contains(&output, "duplicates:");
}

#[test]
fn test_prefix_limits_audit() {
    let t = Test::with_secrets(&[("weak/a", "abc"), ("ok/b", "x9#Tq!7vLm2@Rz")]);
    assert_success(&t.run(&["audit", "ok"]));
    assert_exit_code(&t.run(&["audit", "weak"]), 3);
}

#[test]
fn test_excludes_file() {
    let t = Test::with_secrets(&[("legacy/a", "abc")]);
    let excludes = t.dir.path().join("excludes");
    std::fs::write(&excludes, "# old stuff\n^legacy/\n").unwrap();

    let output = t
        .cmd()
        .args(["audit", "--excludes"])
        .arg(&excludes)
        .output()
        .unwrap();
    assert_success(&output);
}

#[test]
fn test_json_report_to_file() {
    let t = Test::with_secrets(&[("weak", "abc")]);
    let report = t.dir.path().join("report.json");

    let output = t
        .cmd()
        .args(["audit", "--format", "json", "--output"])
        .arg(&report)
        .output()
        .unwrap();
    assert_exit_code(&output, 3);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert!(json.to_string().contains("weak"));
}

#[test]
fn test_unknown_format_rejected() {
    let t = Test::init();
    assert_exit_code(&t.run(&["audit", "--format", "xml"]), 2);
}
