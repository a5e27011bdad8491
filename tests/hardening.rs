//! Concurrency and robustness tests.
//!
//! Mixes process-level checks through the binary with library-level checks
//! against a shared in-memory mount table.

mod support;

use std::sync::{Arc, Barrier};
use std::thread;

use gpass::core::cipher::Plain;
use gpass::core::config::Config;
use gpass::core::context::Context;
use gpass::core::leaf::Store;
use gpass::core::root::{ListOptions, RootStore};
use gpass::core::secret::Secret;
use gpass::core::storage::Memory;
use gpass::error::ErrorKind;
use support::*;

fn memory_root() -> RootStore {
    let config = Arc::new(Config::in_memory());
    let mut root = RootStore::new(config.clone());
    for (alias, ids) in [("", vec!["alice"]), ("team", vec!["alice", "bob"])] {
        let ids: Vec<String> = ids.into_iter().map(str::to_string).collect();
        let store = Store::new(
            alias,
            "inmem://",
            Box::new(Plain::new(ids.clone())),
            Box::new(Memory::with_rcs()),
            config.clone(),
        );
        store.init(&Context::new(), &ids).unwrap();
        root.insert(store).unwrap();
    }
    root
}

// ============================================================================
// Concurrent Access Tests
// ============================================================================

#[test]
fn test_concurrent_cli_reads() {
    let t = Test::with_secrets(&[("k1", "value1"), ("k2", "value2")]);
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let mut cmd = t.cmd();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let name = if i % 2 == 0 { "k1" } else { "k2" };
                barrier.wait();
                let output = cmd
                    .args(["show", "--password", name])
                    .output()
                    .expect("failed to run gpass");
                (i, output)
            })
        })
        .collect();

    for h in handles {
        let (i, output) = h.join().unwrap();
        assert_success(&output);
        let expected = if i % 2 == 0 { "value1" } else { "value2" };
        assert_eq!(stdout(&output).trim(), expected);
    }
}

#[test]
fn test_concurrent_writes_across_mounts() {
    let root = Arc::new(memory_root());
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let root = Arc::clone(&root);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let ctx = Context::new();
                barrier.wait();
                for j in 0..10 {
                    let prefix = if i % 2 == 0 { "" } else { "team/" };
                    let name = format!("{}w{}/s{}", prefix, i, j);
                    root.set(&ctx, &name, &Secret::with_password(&format!("{}-{}", i, j)))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let ctx = Context::new();
    let names = root.list(&ctx, &ListOptions::default()).unwrap();
    assert_eq!(names.len(), 80);
    assert_eq!(
        names.iter().filter(|n| n.starts_with("team/")).count(),
        40
    );
    assert_eq!(root.get(&ctx, "w0/s9").unwrap().password(), "0-9");
    assert_eq!(root.get(&ctx, "team/w7/s3").unwrap().password(), "7-3");
}

#[test]
fn test_readers_see_whole_secrets() {
    let root = Arc::new(memory_root());
    let ctx = Context::new();
    let mut first = Secret::with_password("one");
    first.set("user", "one").unwrap();
    root.set(&ctx, "shared", &first).unwrap();

    let barrier = Arc::new(Barrier::new(5));
    let writer = {
        let root = Arc::clone(&root);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let ctx = Context::new();
            barrier.wait();
            for i in 0..50 {
                let v = if i % 2 == 0 { "two" } else { "one" };
                let mut s = Secret::with_password(v);
                s.set("user", v).unwrap();
                root.set(&ctx, "shared", &s).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let root = Arc::clone(&root);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let ctx = Context::new();
                barrier.wait();
                for _ in 0..50 {
                    let s = root.get(&ctx, "shared").unwrap();
                    // password and key were written together
                    assert_eq!(s.get("user").as_deref(), Some(s.password()));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_canceled_context_stops_transfer() {
    let root = memory_root();
    let ctx = Context::new();
    for i in 0..5 {
        root.set(&ctx, &format!("bulk/{}", i), &Secret::with_password("x"))
            .unwrap();
    }

    let canceled = Context::new();
    canceled.cancel_token().cancel();
    let err = root.copy(&canceled, "bulk", "team/bulk").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Aborted);
    assert!(!root.exists(&ctx, "team/bulk/0"));
}

// ============================================================================
// Edge Cases
// ============================================================================

#[test]
fn test_large_multiline_secret() {
    let t = Test::init();
    let mut body = String::from("pw\n");
    for i in 0..500 {
        body.push_str(&format!("key{}: {}\n", i, "v".repeat(64)));
    }
    assert_success(&t.insert_body("big", &body));

    let output = t.show("big");
    assert_success(&output);
    assert_eq!(stdout(&output), body);
    assert_eq!(
        stdout(&t.run(&["show", "big", "key499"])).trim(),
        "v".repeat(64)
    );
}

#[test]
fn test_unicode_names_and_values() {
    let t = Test::with_secrets(&[("wörter/schlüssel", "pässwörd✓")]);
    assert_eq!(
        stdout(&t.password("wörter/schlüssel")).trim(),
        "pässwörd✓"
    );
    assert_eq!(lines(&t.ls_flat()), vec!["wörter/schlüssel"]);
}

#[test]
fn test_path_traversal_rejected() {
    let t = Test::init();
    let output = t.insert("../escape", "x");
    assert!(!output.status.success());
    assert!(!t.dir.path().join("stores/escape.txt").exists());
}

// ============================================================================
// Property Tests
// ============================================================================

mod proptest_tests {
    use std::collections::BTreeMap;

    use gpass::core::secret::Secret;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn parsed_secret_is_stable(
            password in "[a-zA-Z0-9!#$%&*+=?@^_~]{1,40}",
            pairs in prop::collection::btree_map("k[a-z]{1,7}", "[a-zA-Z0-9./@_-]{1,30}", 0..6),
        ) {
            let mut secret = Secret::with_password(&password);
            for (k, v) in &pairs {
                secret.set(k, v).unwrap();
            }
            let bytes = secret.bytes();

            let parsed = Secret::parse(&bytes).unwrap();
            prop_assert_eq!(parsed.password(), password.as_str());
            for (k, v) in &pairs {
                prop_assert_eq!(parsed.get(k), Some(v.clone()));
            }
            // parsing does not rewrite the body
            prop_assert_eq!(parsed.bytes(), bytes);
        }

        #[test]
        fn arbitrary_text_never_panics(body in "\\PC{0,200}") {
            let secret = Secret::parse(body.as_bytes()).unwrap();
            let again = Secret::parse(&secret.bytes()).unwrap();
            prop_assert_eq!(again.password(), secret.password());
        }

        #[test]
        fn append_keeps_password(
            password in "[a-zA-Z0-9]{1,20}",
            lines in prop::collection::vec("k[a-z]{1,5}: [a-z0-9]{1,10}", 1..5),
        ) {
            let mut secret = Secret::with_password(&password);
            let text: String = lines.iter().map(|l| format!("{}\n", l)).collect();
            secret.append(text.as_bytes()).unwrap();
            prop_assert_eq!(secret.password(), password.as_str());

            let expected: BTreeMap<&str, &str> = lines
                .iter()
                .filter_map(|l| l.split_once(": "))
                .collect();
            for (k, _) in expected {
                prop_assert!(secret.get(k).is_some());
            }
        }
    }
}
