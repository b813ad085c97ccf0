#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! End-to-end scenarios S1–S6: init/import/unlock/read, wrong-secret
//! handling, decoy separation, rotation, tamper detection, and reset.
//! Exercises `VaultManager` against a real `FsObjectStore` on a temp
//! directory rather than the in-memory fake the unit tests in
//! `manager.rs` use.

use securevault_crypto_core::Argon2idParams;
use securevault_vault::{
    FsObjectStore, Identity, LockType, ObjectStore, VaultConfig, VaultError, VaultManager,
    VaultState,
};

const REAL_SECRET: &[u8] = b"correct horse battery staple";
const DECOY_SECRET: &[u8] = b"000000";
const NEW_SECRET: &[u8] = b"p@ssw0rd-2025";

/// Cheap Argon2id parameters for integration tests — the real presets make
/// each `init`/`unlock`/`rotate` call take real-world KDF cost, which is
/// the point in production but prohibitive across a whole test suite.
fn test_params() -> Argon2idParams {
    Argon2idParams {
        m_cost: 32,
        t_cost: 1,
        p_cost: 1,
    }
}

fn open_manager(dir: &std::path::Path) -> VaultManager {
    let mut config = VaultConfig::new(dir);
    config.kdf_params_override = Some(test_params());
    let store = FsObjectStore::open(dir).expect("object store should open");
    VaultManager::open(config, Box::new(store)).expect("manager should open")
}

/// Run S1 against a fresh manager, returning it (still unlocked as REAL)
/// plus the id of the item it imported.
fn run_s1(mgr: &VaultManager) -> securevault_vault::VaultId {
    mgr.init(REAL_SECRET, LockType::Password)
        .expect("init should succeed");

    let item = mgr
        .import(b"hello", "greet.txt", "text/plain")
        .expect("import should succeed");
    assert_eq!(item.size, 5);

    mgr.lock();
    let identity = mgr.unlock(REAL_SECRET).expect("unlock should succeed");
    assert_eq!(identity, Identity::Real);

    let items = mgr.list().expect("list should succeed");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, item.id);

    let preview = mgr.preview(item.id).expect("preview should succeed");
    assert_eq!(preview.bytes(), b"hello");

    item.id
}

#[test]
fn s1_init_import_relock_unlock_read() {
    let dir = tempfile::tempdir().expect("tempdir should succeed");
    let mgr = open_manager(dir.path());
    run_s1(&mgr);
}

#[test]
fn s2_wrong_secret_then_correct_secret() {
    let dir = tempfile::tempdir().expect("tempdir should succeed");
    let mgr = open_manager(dir.path());
    run_s1(&mgr);
    mgr.lock();

    let err = mgr.unlock(b"wrong").expect_err("wrong secret must fail");
    assert!(matches!(err, VaultError::InvalidCredential));

    let identity = mgr
        .unlock(REAL_SECRET)
        .expect("correct secret should still unlock after a failed attempt");
    assert_eq!(identity, Identity::Real);
}

#[test]
fn s3_decoy_separation() {
    let dir = tempfile::tempdir().expect("tempdir should succeed");
    let mgr = open_manager(dir.path());
    let x = run_s1(&mgr);

    mgr.set_decoy(DECOY_SECRET).expect("set_decoy should succeed");
    mgr.lock();

    let identity = mgr.unlock(DECOY_SECRET).expect("decoy unlock should succeed");
    assert_eq!(identity, Identity::Decoy);
    assert!(mgr.list().expect("list should succeed").is_empty());

    mgr.import(b"lie", "note.txt", "text/plain")
        .expect("decoy import should succeed");
    mgr.lock();

    let identity = mgr.unlock(REAL_SECRET).expect("real unlock should succeed");
    assert_eq!(identity, Identity::Real);
    let items = mgr.list().expect("list should succeed");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, x);
}

#[test]
fn s4_rotate_preserves_content() {
    let dir = tempfile::tempdir().expect("tempdir should succeed");
    let mgr = open_manager(dir.path());
    let x = run_s1(&mgr);

    let y = mgr
        .import(b"world", "w.txt", "text/plain")
        .expect("import should succeed");

    mgr.set_decoy(DECOY_SECRET).expect("set_decoy should succeed");

    mgr.rotate(REAL_SECRET, NEW_SECRET, LockType::Password, None, None)
        .expect("rotate should succeed");
    assert_eq!(mgr.state(), VaultState::Locked);

    assert!(matches!(
        mgr.unlock(REAL_SECRET),
        Err(VaultError::InvalidCredential)
    ));
    mgr.unlock(NEW_SECRET).expect("new secret should unlock");

    assert_eq!(mgr.preview(x).expect("preview x").bytes(), b"hello");
    assert_eq!(mgr.preview(y.id).expect("preview y").bytes(), b"world");

    mgr.lock();
    assert!(
        matches!(mgr.unlock(DECOY_SECRET), Err(VaultError::InvalidCredential)),
        "the former decoy secret must not unlock anything after rotation"
    );
    mgr.unlock(NEW_SECRET).expect("new secret should still unlock");
}

#[test]
fn s5_tamper_detection_leaves_index_intact() {
    let dir = tempfile::tempdir().expect("tempdir should succeed");
    let mgr = open_manager(dir.path());
    let x = run_s1(&mgr);
    mgr.lock();

    let envelope_path = dir.path().join(format!("file/{x}"));
    let mut bytes = std::fs::read(&envelope_path).expect("envelope should exist on disk");
    bytes[20] ^= 0xFF;
    std::fs::write(&envelope_path, &bytes).expect("tamper write should succeed");

    let identity = mgr.unlock(REAL_SECRET).expect("unlock should still succeed");
    assert_eq!(identity, Identity::Real);

    assert!(matches!(mgr.preview(x), Err(VaultError::Crypto(_))));

    let items = mgr.list().expect("list should succeed");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, x);
}

#[test]
fn s6_reset_wipes_everything() {
    let dir = tempfile::tempdir().expect("tempdir should succeed");
    let mgr = open_manager(dir.path());
    run_s1(&mgr);
    mgr.lock();

    mgr.reset(REAL_SECRET).expect("reset should succeed");
    assert!(!mgr.is_initialized());

    let store = FsObjectStore::open(dir.path()).expect("object store should reopen");
    assert!(store.list("file").expect("list should succeed").is_empty());
    assert!(store.list("meta").expect("list should succeed").is_empty());

    assert!(matches!(
        mgr.unlock(REAL_SECRET),
        Err(VaultError::NotInitialized)
    ));
}

#[test]
fn unlock_survives_process_restart_via_reopened_manager() {
    let dir = tempfile::tempdir().expect("tempdir should succeed");
    {
        let mgr = open_manager(dir.path());
        run_s1(&mgr);
    }
    // Drop and reopen against the same on-disk root, simulating a process
    // restart — nothing in `VaultManager` may depend on in-process state
    // surviving, since the registry and object store are the only source
    // of truth once locked.
    let mgr = open_manager(dir.path());
    assert_eq!(mgr.state(), VaultState::Locked);
    let identity = mgr.unlock(REAL_SECRET).expect("unlock should succeed");
    assert_eq!(identity, Identity::Real);
    assert_eq!(mgr.list().expect("list should succeed").len(), 1);
}
