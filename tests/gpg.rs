//! GPG backend tests against a real gpg binary.
//!
//! Each test runs in an ephemeral GNUPGHOME so the user's keyring is never
//! touched. Gated behind the `test-gpg` feature flag.

#![cfg(feature = "test-gpg")]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use gpass::core::cipher::{Cipher, Gpg};
use gpass::core::config::Config;
use gpass::core::context::Context;
use gpass::core::leaf::Store;
use gpass::core::secret::Secret;
use gpass::core::storage::Memory;
use tempfile::TempDir;

fn gpg_home() -> (TempDir, Gpg) {
    let home = TempDir::new().unwrap();
    fs::set_permissions(home.path(), fs::Permissions::from_mode(0o700)).unwrap();
    let gpg = Gpg::new()
        .expect("gpg not installed")
        .with_home(home.path().to_path_buf());
    (home, gpg)
}

#[test]
fn test_gpg_generate_encrypt_decrypt() {
    let (_home, gpg) = gpg_home();
    let ctx = Context::new();
    let fpr = gpg
        .generate_identity(&ctx, "Alice", "alice@example.org", "")
        .unwrap();

    assert_eq!(gpg.list_identities(&ctx).unwrap(), vec![fpr.clone()]);
    assert_eq!(gpg.find_recipients(&ctx, "ALICE").unwrap(), vec![fpr.clone()]);

    let ciphertext = gpg.encrypt(&ctx, b"hunter2\n", &[fpr]).unwrap();
    assert_eq!(gpg.decrypt(&ctx, &ciphertext).unwrap(), b"hunter2\n");
    assert_eq!(gpg.recipient_ids(&ctx, &ciphertext).unwrap().len(), 1);
}

#[test]
fn test_gpg_unknown_recipient() {
    let (_home, gpg) = gpg_home();
    let ctx = Context::new();
    let fpr = gpg
        .generate_identity(&ctx, "Alice", "alice@example.org", "")
        .unwrap();
    let recipients = vec![fpr, "nobody@example.org".to_string()];

    assert!(gpg.encrypt(&ctx, b"x", &recipients).is_err());
    // force degrades to the usable recipients
    let ciphertext = gpg
        .encrypt(&ctx.with_force(true), b"x", &recipients)
        .unwrap();
    assert_eq!(gpg.decrypt(&ctx, &ciphertext).unwrap(), b"x");
}

#[test]
fn test_gpg_export_import() {
    let (_a, alice) = gpg_home();
    let (_b, bob) = gpg_home();
    let ctx = Context::new();
    let fpr = alice
        .generate_identity(&ctx, "Alice", "alice@example.org", "")
        .unwrap();

    let exported = alice.export_public_key(&ctx, &fpr).unwrap();
    assert_eq!(bob.import_public_key(&ctx, &exported).unwrap(), fpr);
    assert_eq!(bob.list_recipients(&ctx).unwrap(), vec![fpr]);
}

#[test]
fn test_gpg_store_roundtrip() {
    let (_home, gpg) = gpg_home();
    let ctx = Context::new();
    let fpr = gpg
        .generate_identity(&ctx, "Alice", "alice@example.org", "")
        .unwrap();

    let store = Store::new(
        "",
        "inmem://",
        Box::new(gpg),
        Box::new(Memory::new()),
        Arc::new(Config::in_memory()),
    );
    store.init(&ctx, &[fpr]).unwrap();

    let mut secret = Secret::with_password("s3cret");
    secret.set("user", "alice").unwrap();
    store.set(&ctx, "web/site", &secret).unwrap();

    let read = store.get(&ctx, "web/site").unwrap();
    assert_eq!(read.password(), "s3cret");
    assert_eq!(read.get("user").as_deref(), Some("alice"));
}
