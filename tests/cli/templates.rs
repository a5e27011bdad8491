//! Tests for templates and their use by `gpass generate`.

use crate::support::*;

fn set_template(t: &Test, name: &str, body: &str) {
    let output = t
        .cmd()
        .args(["templates", "set", name])
        .write_stdin(body.to_string())
        .output()
        .unwrap();
    assert_success(&output);
}

#[test]
fn test_template_crud() {
    let t = Test::init();
    set_template(&t, "web", "{{ .Content }}\nurl: {{ .Name }}\n");

    let ls = t.run(&["templates", "ls"]);
    assert_eq!(lines(&ls), vec!["web"]);

    let show = t.run(&["templates", "show", "web"]);
    assert_eq!(stdout(&show), "{{ .Content }}\nurl: {{ .Name }}\n");

    assert_success(&t.run(&["templates", "rm", "web"]));
    assert_stdout_contains(&t.run(&["templates", "ls"]), "no templates");
}

#[test]
fn test_templates_are_not_secrets() {
    let t = Test::init();
    set_template(&t, "web", "{{ .Content }}\n");
    assert!(lines(&t.ls_flat()).is_empty());
}

#[test]
fn test_generate_applies_template() {
    let t = Test::init();
    set_template(&t, "web", "{{ .Content }}\nurl: {{ .Name }}\nhash: {{ .Content | md5sum }}\n");

    assert_success(&t.run(&["generate", "web/example.com", "20"]));

    let pw = stdout(&t.password("web/example.com")).trim().to_string();
    assert_eq!(pw.chars().count(), 20);
    let url = t.run(&["show", "web/example.com", "url"]);
    assert_eq!(stdout(&url).trim(), "example.com");
    let hash = stdout(&t.run(&["show", "web/example.com", "hash"]));
    assert_eq!(hash.trim().len(), 32);
}

#[test]
fn test_template_lookup_reads_other_secret() {
    let t = Test::with_secrets(&[("shared/db", "dbpass")]);
    set_template(&t, "apps", "{{ .Content }}\ndb: {{ getpw \"shared/db\" }}\n");

    assert_success(&t.run(&["generate", "apps/api"]));
    let db = t.run(&["show", "apps/api", "db"]);
    assert_eq!(stdout(&db).trim(), "dbpass");
}

#[test]
fn test_template_recursion_fails() {
    let t = Test::init();
    assert_success(&t.insert_body("loop/a", "{{ getpw \"loop/b\" }}\n"));
    assert_success(&t.insert_body("loop/b", "{{ getpw \"loop/a\" }}\n"));
    set_template(&t, "x", "{{ getpw \"loop/a\" }}\n");

    let output = t.run(&["generate", "x/new"]);
    assert_exit_code(&output, 61);
    assert_exit_code(&t.show("x/new"), 10);
}

#[test]
fn test_template_unknown_function_fails() {
    let t = Test::init();
    set_template(&t, "x", "{{ nope .Content }}\n");
    assert_exit_code(&t.run(&["generate", "x/new"]), 62);
}
