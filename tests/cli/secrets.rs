//! Tests for insert, show, ls, rm, mv, cp and link.

use crate::support::*;

#[test]
fn test_insert_via_stdin_then_show() {
    let t = Test::init();

    let output = t.insert("web/example.com", "hunter2");
    assert_success(&output);
    assert_stdout_contains(&output, "saved web/example.com");

    let show = t.show("web/example.com");
    assert_success(&show);
    assert_eq!(stdout(&show), "hunter2\n");
}

#[test]
fn test_insert_only_first_line_without_multiline() {
    let t = Test::init();
    let output = t
        .cmd()
        .args(["insert", "mail"])
        .write_stdin("first\nsecond\n")
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&t.password("mail")).trim(), "first");
}

#[test]
fn test_multiline_body_keys() {
    let t = Test::init();
    assert_success(&t.insert_body(
        "db/prod",
        "s3cret\nuser: admin\nurl: db.example.com\nnotes line\n",
    ));

    let user = t.run(&["show", "db/prod", "user"]);
    assert_success(&user);
    assert_eq!(stdout(&user).trim(), "admin");

    let pw = t.password("db/prod");
    assert_eq!(stdout(&pw).trim(), "s3cret");

    // the body comes back unchanged
    let full = t.show("db/prod");
    assert_eq!(
        stdout(&full),
        "s3cret\nuser: admin\nurl: db.example.com\nnotes line\n"
    );
}

#[test]
fn test_missing_key_is_not_found() {
    let t = Test::with_secrets(&[("db/prod", "pw")]);
    let output = t.run(&["show", "db/prod", "user"]);
    assert_exit_code(&output, 10);
    assert_stderr_contains(&output, "db/prod:user");
}

#[test]
fn test_show_missing_secret_exit_code() {
    let t = Test::init();
    let output = t.show("nope");
    assert_exit_code(&output, 10);
    assert_stderr_contains(&output, "not found");
}

#[test]
fn test_insert_existing_without_force_fails() {
    let t = Test::with_secrets(&[("a", "one")]);
    let output = t.insert("a", "two");

    assert_exit_code(&output, 11);
    assert_eq!(stdout(&t.password("a")).trim(), "one");

    let forced = t
        .cmd()
        .args(["insert", "--force", "a"])
        .write_stdin("two\n")
        .output()
        .unwrap();
    assert_success(&forced);
    assert_eq!(stdout(&t.password("a")).trim(), "two");
}

#[test]
fn test_insert_single_key() {
    let t = Test::with_secrets(&[("a", "pw")]);
    let output = t
        .cmd()
        .args(["insert", "a", "user"])
        .write_stdin("bob\n")
        .output()
        .unwrap();
    assert_success(&output);

    assert_eq!(stdout(&t.run(&["show", "a", "user"])).trim(), "bob");
    assert_eq!(stdout(&t.password("a")).trim(), "pw");
}

#[test]
fn test_ls_flat_and_tree() {
    let t = Test::with_secrets(&[("web/b", "1"), ("web/a", "2"), ("db", "3")]);

    let flat = t.ls_flat();
    assert_success(&flat);
    assert_eq!(lines(&flat), vec!["db", "web/a", "web/b"]);

    let tree = t.run(&["ls"]);
    assert_success(&tree);
    let out = stdout(&tree);
    assert!(out.starts_with("gpass\n"));
    assert!(out.contains("web/"));
    assert!(out.contains("└── b"));

    let folders = t.run(&["ls", "--folders"]);
    assert_eq!(lines(&folders), vec!["web/"]);
}

#[test]
fn test_ls_empty_store() {
    let t = Test::init();
    let output = t.run(&["ls"]);
    assert_success(&output);
    assert_stdout_contains(&output, "no secrets stored");
}

#[test]
fn test_show_folder_lists_it() {
    let t = Test::with_secrets(&[("web/a", "1"), ("web/b", "2")]);
    let output = t.show("web");
    assert_success(&output);
    assert_stdout_contains(&output, "a");
    assert_stdout_contains(&output, "b");
}

#[test]
fn test_rm_requires_confirmation() {
    let t = Test::with_secrets(&[("a", "1")]);

    // stdin is not a terminal, so nobody can confirm
    let output = t.run(&["rm", "a"]);
    assert_exit_code(&output, 60);
    assert_success(&t.show("a"));

    assert_success(&t.run(&["rm", "--force", "a"]));
    assert_exit_code(&t.show("a"), 10);
}

#[test]
fn test_rm_with_global_yes() {
    let t = Test::with_secrets(&[("a", "1")]);
    assert_success(&t.run(&["--yes", "rm", "a"]));
    assert!(lines(&t.ls_flat()).is_empty());
}

#[test]
fn test_rm_recursive() {
    let t = Test::with_secrets(&[("web/a", "1"), ("web/deep/b", "2"), ("db", "3")]);
    assert_success(&t.run(&["rm", "-r", "-f", "web"]));
    assert_eq!(lines(&t.ls_flat()), vec!["db"]);
}

#[test]
fn test_mv_within_store() {
    let t = Test::with_secrets(&[("old", "pw")]);
    let output = t.run(&["mv", "old", "new"]);
    assert_success(&output);
    assert_stdout_contains(&output, "moved old to new");

    assert_eq!(lines(&t.ls_flat()), vec!["new"]);
    assert_eq!(stdout(&t.password("new")).trim(), "pw");
}

#[test]
fn test_cp_folder() {
    let t = Test::with_secrets(&[("web/a", "1"), ("web/b", "2")]);
    let output = t.run(&["cp", "web", "backup"]);
    assert_success(&output);
    assert_stdout_contains(&output, "copied 2 secrets");

    assert_eq!(
        lines(&t.ls_flat()),
        vec!["backup/a", "backup/b", "web/a", "web/b"]
    );
}

#[test]
fn test_mv_onto_existing_needs_force() {
    let t = Test::with_secrets(&[("a", "1"), ("b", "2")]);
    let output = t.run(&["mv", "a", "b"]);
    assert_exit_code(&output, 11);

    assert_success(&t.run(&["mv", "--force", "a", "b"]));
    assert_eq!(stdout(&t.password("b")).trim(), "1");
}

#[test]
fn test_link_resolves_to_target() {
    let t = Test::with_secrets(&[("real", "pw")]);
    assert_success(&t.run(&["link", "real", "alias"]));
    assert_eq!(stdout(&t.password("alias")).trim(), "pw");
}
