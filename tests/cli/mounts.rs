//! Tests for sub-store mounts and cross-mount transfers.

use crate::support::*;

fn with_team() -> Test {
    let t = Test::init();
    let output = t.init_cmd("team", &t.store_path("team"));
    assert!(
        output.status.success(),
        "Failed to initialize team store: {}",
        stderr(&output)
    );
    t
}

#[test]
fn test_mounts_ls() {
    let t = with_team();
    let output = t.run(&["mounts", "ls"]);
    assert_success(&output);

    let out = lines(&output);
    assert_eq!(out.len(), 2);
    assert!(out[0].starts_with("root => "));
    assert!(out[1].starts_with("team => "));
    assert!(out[1].ends_with("(plain, fs)"));
}

#[test]
fn test_names_route_to_longest_mount() {
    let t = with_team();
    assert_success(&t.insert("team/db", "team-pw"));
    assert_success(&t.insert("db", "root-pw"));

    assert!(t.store_path("team").join("db.txt").is_file());
    assert!(t.store_path("").join("db.txt").is_file());
    assert_eq!(stdout(&t.password("team/db")).trim(), "team-pw");
    assert_eq!(lines(&t.ls_flat()), vec!["db", "team/db"]);
}

#[test]
fn test_mv_across_mounts() {
    let t = with_team();
    assert_success(&t.insert_body("web/a", "pw\nuser: me\n"));

    let output = t.run(&["mv", "web/a", "team/a"]);
    assert_success(&output);

    assert_eq!(lines(&t.ls_flat()), vec!["team/a"]);
    assert_eq!(stdout(&t.show("team/a")), "pw\nuser: me\n");
    assert!(!t.store_path("").join("web/a.txt").exists());
}

#[test]
fn test_cp_folder_across_mounts() {
    let t = with_team();
    assert_success(&t.insert("web/a", "1"));
    assert_success(&t.insert("web/b", "2"));

    let output = t.run(&["cp", "web", "team/web"]);
    assert_success(&output);
    assert_stdout_contains(&output, "copied 2 secrets");
    assert_eq!(
        lines(&t.ls_flat()),
        vec!["team/web/a", "team/web/b", "web/a", "web/b"]
    );
}

#[test]
fn test_moving_a_mount_point_fails() {
    let t = with_team();
    assert_success(&t.insert("team/x", "1"));
    let output = t.run(&["mv", "team", "other"]);
    assert!(!output.status.success());
    assert_success(&t.show("team/x"));
}

#[test]
fn test_unmount_keeps_files() {
    let t = with_team();
    assert_success(&t.insert("team/x", "1"));

    assert_success(&t.run(&["mounts", "rm", "team"]));
    assert_eq!(lines(&t.run(&["mounts", "ls"])).len(), 1);
    assert!(t.store_path("team").join("x.txt").is_file());

    // team/x now routes to the root store, which does not have it
    assert_exit_code(&t.show("team/x"), 10);

    let mut add = t.cmd();
    add.args(["mounts", "add", "team"]).arg(t.store_path("team"));
    assert_success(&add.output().unwrap());
    assert_eq!(stdout(&t.password("team/x")).trim(), "1");
}

#[test]
fn test_unmount_unknown_alias() {
    let t = Test::init();
    assert_exit_code(&t.run(&["mounts", "rm", "nope"]), 40);
}

#[test]
fn test_mount_uninitialized_dir_fails() {
    let t = Test::init();
    let empty = t.dir.path().join("empty");
    std::fs::create_dir_all(&empty).unwrap();

    let mut cmd = t.cmd();
    cmd.args(["mounts", "add", "x"]).arg(&empty);
    assert_exit_code(&cmd.output().unwrap(), 12);
}
