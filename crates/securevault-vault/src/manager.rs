//! C5 — Vault Manager: the state machine orchestrating C1–C4.
//!
//! Owns the session (data key + metadata index), serializes every public
//! operation against a single internal mutex, and is the only place that
//! knows how to combine the KDF, the AEAD codec, the object store and the
//! credential registry into `init`/`unlock`/`import`/`rotate`/etc. Per the
//! redesign flag in spec §9, the session is an explicit field with a clear
//! owner — never a global singleton.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;
use securevault_crypto_core::{self as crypto, Argon2idParams};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::ids::VaultId;
use crate::metadata::{MetadataIndex, VaultItem};
use crate::object_store::ObjectStore;
use crate::registry::{CredentialRegistry, Identity as RegistryIdentity, LockType};
use crate::session::{Identity, PreviewHandle, Session};

/// Logical name for the rotation recovery journal. Lives at the store root,
/// outside the `file/`/`meta/` subtrees, alongside the credential registry.
const ROTATION_JOURNAL: &str = "rotation.journal";

/// Logical name for the decoy identity's metadata envelope.
const META_DECOY: &str = "meta/decoy";

/// Logical name for the real identity's metadata envelope.
const META_REAL: &str = "meta/real";

/// Shadow-object suffix used by the rotation staging phase (spec §4.5,
/// generalized — see the module-level rationale in [`VaultManager::rotate`]).
const ROTATING_SUFFIX: &str = ".rotating";

// ---------------------------------------------------------------------------
// Public supporting types
// ---------------------------------------------------------------------------

/// The six states of spec §4.5's state machine. `Rotating` and `Wiped` are
/// transient — they are never the value [`VaultManager::state`] observes at
/// rest, since `rotate` and `reset` always resolve to `Locked`/`Uninitialized`
/// before returning control to the caller. They are kept as variants anyway
/// because the spec names them as states, not merely as in-flight footnotes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultState {
    Uninitialized,
    Locked,
    UnlockedReal,
    UnlockedDecoy,
    Rotating,
    Wiped,
}

/// Progress reported by [`VaultManager::rotate`] at item granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RotationProgress {
    pub done: usize,
    pub total: usize,
}

/// A cooperative cancellation flag for long-running operations (`rotate`,
/// bulk `import`). Cheap to clone and safe to share across the worker pool.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The rotation recovery journal, persisted in plaintext (it carries no
/// secret — only the same salt/verifier shape the credential registry
/// already stores in the clear, plus item ids).
///
/// `committing` marks the point of no return: once the commit phase has
/// started copying shadow objects onto their final names under `new_key`,
/// an interrupted rotation can no longer be safely abandoned, since some
/// `file/<id>` or `meta/real` objects may already be unrecoverable under
/// `old_key`. See [`VaultManager::recover_rotation`].
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RotationJournal {
    new_salt: Vec<u8>,
    new_verifier_real: [u8; 32],
    new_lock_type: LockType,
    new_kdf_params: Argon2idParams,
    total_ids: Vec<VaultId>,
    #[serde(default)]
    committing: bool,
}

// ---------------------------------------------------------------------------
// Internal state guarded by the manager's mutex
// ---------------------------------------------------------------------------

struct Inner {
    registry: CredentialRegistry,
    session: Option<Session>,
}

/// The Vault Manager: the single serializing entry point for every vault
/// operation. `ObjectStore` and `CredentialRegistry` are injected handles —
/// production code wires up [`crate::object_store::FsObjectStore`], tests
/// use [`crate::object_store::MemObjectStore`].
pub struct VaultManager {
    config: VaultConfig,
    store: Box<dyn ObjectStore>,
    inner: Mutex<Inner>,
}

impl VaultManager {
    /// Open a manager rooted at `config.root`, with `store` as the backing
    /// object store and a freshly-opened credential registry at
    /// `<root>/registry.json`.
    ///
    /// # Errors
    /// Returns `VaultError::Io` if the registry file exists but cannot be
    /// read, or is corrupt JSON.
    pub fn open(config: VaultConfig, store: Box<dyn ObjectStore>) -> Result<Self, VaultError> {
        let registry_path = config.root.join("registry.json");
        let registry = CredentialRegistry::open(registry_path)?;
        Ok(Self {
            config,
            store,
            inner: Mutex::new(Inner {
                registry,
                session: None,
            }),
        })
    }

    /// The manager's current externally-observable state.
    #[must_use]
    pub fn state(&self) -> VaultState {
        let inner = self.inner.lock().expect("vault manager mutex poisoned");
        if !inner.registry.is_initialized() {
            return VaultState::Uninitialized;
        }
        match inner.session.as_ref().map(Session::identity) {
            None => VaultState::Locked,
            Some(Identity::Real) => VaultState::UnlockedReal,
            Some(Identity::Decoy) => VaultState::UnlockedDecoy,
        }
    }

    /// Debug hook for testable property 9: reports whether a session (and
    /// therefore live key material) currently exists. Does not expose the
    /// key itself — only its presence.
    #[must_use]
    pub fn debug_has_live_session(&self) -> bool {
        let inner = self.inner.lock().expect("vault manager mutex poisoned");
        inner.session.is_some()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        let inner = self.inner.lock().expect("vault manager mutex poisoned");
        inner.registry.is_initialized()
    }

    // -----------------------------------------------------------------
    // init
    // -----------------------------------------------------------------

    /// `UNINITIALIZED --init(secret, lock_type)--> LOCKED`.
    ///
    /// # Errors
    /// `VaultError::AlreadyInitialized`, `VaultError::ConstraintViolated`
    /// (secret shape), or a crypto/IO error.
    #[instrument(skip(self, secret))]
    pub fn init(&self, secret: &[u8], lock_type: LockType) -> Result<(), VaultError> {
        lock_type.validate(secret)?;
        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        if inner.registry.is_initialized() {
            return Err(VaultError::AlreadyInitialized);
        }

        let params = self.config.effective_kdf_params();
        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);

        let verifier_real = crypto::derive_verifier(secret, &salt, &params)?;
        let data_key = crypto::derive_key(secret, &salt, &params)?;

        let empty_index = MetadataIndex::new();
        let plaintext = empty_index.encode()?;
        let envelope = crypto::encrypt(&plaintext, data_key.expose())?;
        self.store.put(META_REAL, &envelope.to_bytes())?;

        inner
            .registry
            .init(&salt, &verifier_real, lock_type, params)?;

        info!("vault initialized");
        Ok(())
    }

    // -----------------------------------------------------------------
    // unlock / lock
    // -----------------------------------------------------------------

    /// `LOCKED --unlock(secret)--> UNLOCKED_REAL | UNLOCKED_DECOY`.
    ///
    /// If a rotation journal is present from an interrupted `rotate`, this
    /// call resolves it first (see [`Self::recover_rotation`]) before
    /// attempting the ordinary unlock.
    ///
    /// # Errors
    /// `VaultError::NotInitialized`, `VaultError::InvalidCredential`,
    /// `VaultError::ConstraintViolated` (already unlocked, or — only when
    /// `VaultConfig::unlock_cooldown_enabled` is set — a brute-force
    /// cooldown active), `VaultError::Crypto` if the metadata envelope
    /// fails to authenticate (this is the one `CryptoError` site that
    /// propagates with the session left `LOCKED`, per spec §7). The correct
    /// secret always unlocks immediately by default (spec §2); the cooldown
    /// is opt-in and, when enabled, can also delay the correct secret.
    #[instrument(skip(self, secret))]
    pub fn unlock(&self, secret: &[u8]) -> Result<Identity, VaultError> {
        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        if !inner.registry.is_initialized() {
            return Err(VaultError::NotInitialized);
        }
        if inner.session.is_some() {
            return Err(VaultError::ConstraintViolated(
                "vault is already unlocked".into(),
            ));
        }

        self.recover_rotation(&mut inner, secret)?;

        let now = now_secs();
        if self.config.unlock_cooldown_enabled {
            if let Some(remaining_ms) = inner.registry.check_cooldown(now) {
                return Err(VaultError::ConstraintViolated(format!(
                    "unlock cooldown active: retry in {remaining_ms}ms"
                )));
            }
        }

        let salt = inner.registry.get_salt()?;
        let params = inner.registry.kdf_params()?;
        let verifier = crypto::derive_verifier(secret, &salt, &params)?;

        let Some(registry_identity) = inner.registry.identify(&verifier) else {
            if self.config.unlock_cooldown_enabled {
                inner.registry.record_failed_attempt(now)?;
            }
            warn!("unlock rejected: credential matched neither identity");
            return Err(VaultError::InvalidCredential);
        };
        if self.config.unlock_cooldown_enabled {
            inner.registry.reset_attempts()?;
        }

        let identity: Identity = registry_identity.into();
        let data_key = crypto::derive_key(secret, &salt, &params)?;

        let object_name = identity.metadata_object_name();
        let metadata_index = match self.store.get(object_name) {
            Ok(bytes) => {
                let envelope = crypto::Envelope::from_bytes(&bytes)?;
                let plaintext = crypto::decrypt(&envelope, data_key.expose())?;
                MetadataIndex::decode(plaintext.expose(), self.config.metadata_bound_bytes)?
            }
            Err(VaultError::NotFound(_)) if registry_identity == RegistryIdentity::Decoy => {
                // A decoy verifier exists but its envelope was never written
                // (shouldn't happen via this manager's own `set_decoy`, but
                // tolerate it rather than bricking the decoy unlock path).
                MetadataIndex::new()
            }
            Err(e) => return Err(e),
        };

        debug!(identity = ?identity, items = metadata_index.len(), "unlock succeeded");
        inner.session = Some(Session::new(data_key, identity, metadata_index));
        Ok(identity)
    }

    /// `UNLOCKED_* --lock()--> LOCKED`. Zeroes the data key and drops the
    /// in-memory metadata index.
    #[instrument(skip(self))]
    pub fn lock(&self) {
        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        if inner.session.take().is_some() {
            debug!("vault locked");
        }
    }

    // -----------------------------------------------------------------
    // import / list / preview / export / delete
    // -----------------------------------------------------------------

    /// `UNLOCKED_* --import(bytes, name, mime)--> UNLOCKED_*`.
    ///
    /// If the metadata write fails after the file write succeeded, the file
    /// envelope is deleted and the error is surfaced — the vault remains
    /// consistent because the item never enters the index.
    ///
    /// # Errors
    /// `VaultError::Locked`, or a crypto/IO error.
    #[instrument(skip(self, bytes, original_name, mime_type), fields(len = bytes.len()))]
    pub fn import(
        &self,
        bytes: &[u8],
        original_name: &str,
        mime_type: &str,
    ) -> Result<VaultItem, VaultError> {
        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        let session = inner.session.as_mut().ok_or(VaultError::Locked)?;

        let id = VaultId::generate();
        let item = VaultItem {
            id,
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            imported_at: now_secs(),
        };

        let envelope = crypto::encrypt(bytes, session.data_key.expose())?;
        self.store.put(&id.object_name(), &envelope.to_bytes())?;

        session.metadata_index.push_front(item.clone());
        if let Err(e) = self.persist_metadata(session) {
            session.metadata_index.remove(id);
            let _ = self.store.delete(&id.object_name());
            return Err(e);
        }

        debug!(id = %id, "item imported");
        Ok(item)
    }

    /// `UNLOCKED_* --delete(id)--> UNLOCKED_*`.
    ///
    /// # Errors
    /// `VaultError::Locked`, `VaultError::NotFound` if `id` is not in the
    /// current identity's index, or an IO error.
    #[instrument(skip(self))]
    pub fn delete(&self, id: VaultId) -> Result<(), VaultError> {
        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        let session = inner.session.as_mut().ok_or(VaultError::Locked)?;

        if !session.metadata_index.contains(id) {
            return Err(VaultError::NotFound(id.object_name()));
        }

        self.store.delete(&id.object_name())?;
        session.metadata_index.remove(id);
        self.persist_metadata(session)?;

        debug!(id = %id, "item deleted");
        Ok(())
    }

    /// `UNLOCKED_* --preview(id)--> UNLOCKED_*`. Returns a [`PreviewHandle`]
    /// whose buffer is zeroed on drop — the "caller-held token" of spec
    /// §4.5 that ensures preview buffers are wiped without requiring the
    /// caller to remember to do so.
    ///
    /// # Errors
    /// `VaultError::Locked`, `VaultError::NotFound`, or
    /// `VaultError::Crypto` (tampered envelope) — the latter does not
    /// affect the session or other items.
    pub fn preview(&self, id: VaultId) -> Result<PreviewHandle, VaultError> {
        let plaintext = self.read_plaintext(id)?;
        Ok(PreviewHandle::new(plaintext.expose().to_vec()))
    }

    /// `UNLOCKED_* --export(id)--> UNLOCKED_*`. Returns owned plaintext
    /// bytes for the external collaborator to write to public storage.
    /// Callers SHOULD zero the buffer once done with it (spec §5).
    ///
    /// # Errors
    /// Same as [`Self::preview`].
    pub fn export(&self, id: VaultId) -> Result<Vec<u8>, VaultError> {
        let plaintext = self.read_plaintext(id)?;
        Ok(plaintext.expose().to_vec())
    }

    fn read_plaintext(&self, id: VaultId) -> Result<crypto::SecretBuffer, VaultError> {
        let inner = self.inner.lock().expect("vault manager mutex poisoned");
        let session = inner.session.as_ref().ok_or(VaultError::Locked)?;

        if !session.metadata_index.contains(id) {
            return Err(VaultError::NotFound(id.object_name()));
        }

        let raw = self.store.get(&id.object_name())?;
        let envelope = crypto::Envelope::from_bytes(&raw)?;
        let plaintext = crypto::decrypt(&envelope, session.data_key.expose())?;
        Ok(plaintext)
    }

    /// A read-only snapshot of the current identity's items, newest-first.
    ///
    /// # Errors
    /// `VaultError::Locked`.
    pub fn list(&self) -> Result<Vec<VaultItem>, VaultError> {
        let inner = self.inner.lock().expect("vault manager mutex poisoned");
        let session = inner.session.as_ref().ok_or(VaultError::Locked)?;
        Ok(session.metadata_index.iter().cloned().collect())
    }

    fn persist_metadata(&self, session: &Session) -> Result<(), VaultError> {
        let plaintext = session.metadata_index.encode()?;
        let envelope = crypto::encrypt(&plaintext, session.data_key.expose())?;
        self.store
            .put(session.identity().metadata_object_name(), &envelope.to_bytes())
    }

    // -----------------------------------------------------------------
    // decoy identity
    // -----------------------------------------------------------------

    /// `UNLOCKED_REAL --set_decoy(decoy_secret)--> UNLOCKED_REAL`.
    ///
    /// # Errors
    /// `VaultError::Locked`, `VaultError::DecoyForbidden` if called from the
    /// decoy session, `VaultError::ConstraintViolated` if the decoy verifier
    /// would equal the real one.
    #[instrument(skip(self, decoy_secret))]
    pub fn set_decoy(&self, decoy_secret: &[u8]) -> Result<(), VaultError> {
        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        require_real(&inner)?;

        let salt = inner.registry.get_salt()?;
        let params = inner.registry.kdf_params()?;
        let verifier_decoy = crypto::derive_verifier(decoy_secret, &salt, &params)?;
        let decoy_key = crypto::derive_key(decoy_secret, &salt, &params)?;

        inner.registry.set_decoy(&verifier_decoy)?;

        let empty_index = MetadataIndex::new();
        let plaintext = empty_index.encode()?;
        let envelope = crypto::encrypt(&plaintext, decoy_key.expose())?;
        self.store.put(META_DECOY, &envelope.to_bytes())?;

        info!("decoy identity configured");
        Ok(())
    }

    /// `UNLOCKED_REAL --remove_decoy()--> UNLOCKED_REAL`.
    ///
    /// Open Question 1 (spec §9): this implementation picks option (a) —
    /// eager delete — made safe to do *without* the decoy secret: since
    /// every `file/<id>` blob belongs to exactly one of the two indices,
    /// "referenced only by the decoy index" is exactly the complement of
    /// the real index's id set, which the REAL session already holds. No
    /// decryption of `meta/decoy` is needed to compute it. See DESIGN.md.
    ///
    /// # Errors
    /// `VaultError::Locked`, `VaultError::DecoyForbidden`.
    #[instrument(skip(self))]
    pub fn remove_decoy(&self) -> Result<(), VaultError> {
        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        require_real(&inner)?;

        inner.registry.clear_decoy()?;
        self.store.delete(META_DECOY)?;
        let keep: std::collections::HashSet<String> = inner
            .session
            .as_ref()
            .expect("require_real just confirmed a real session")
            .metadata_index
            .ids()
            .iter()
            .map(VaultId::object_name)
            .collect();
        self.sweep_unreferenced_files(&keep);

        info!("decoy identity removed");
        Ok(())
    }

    /// Delete every `file/<id>` object not named in `keep`. Used by
    /// `remove_decoy` and `rotate` to collect decoy-only blobs by
    /// set-subtraction against the real index, per spec §4.5 step 6.
    fn sweep_unreferenced_files(&self, keep: &std::collections::HashSet<String>) {
        let Ok(names) = self.store.list(crate::object_store::FILE_PREFIX) else {
            return;
        };
        for name in names {
            if !keep.contains(&name) {
                let _ = self.store.delete(&name);
            }
        }
    }

    // -----------------------------------------------------------------
    // rotate
    // -----------------------------------------------------------------

    /// `UNLOCKED_REAL --rotate(old_secret, new_secret, new_type)--> ROTATING --> LOCKED`.
    ///
    /// Implements the seven-step protocol of spec §4.5 using a
    /// stage-then-commit strategy instead of in-place overwriting:
    ///
    /// 1. Re-verify `old_secret`, derive `old_key`, load the real index.
    /// 2. Generate `new_salt`/`new_key`/`new_verifier_real`; persist a
    ///    recovery journal naming them plus every id to migrate.
    /// 3. For each id (parallelized over a bounded worker pool): decrypt
    ///    under `old_key`, re-encrypt under `new_key`, write the result to
    ///    a shadow object `file/<id>.rotating` — the original `file/<id>`
    ///    is untouched, so the vault remains fully openable with
    ///    `old_secret` for the entire staging phase, no reverse-migration
    ///    needed if staging is aborted.
    /// 4. Stage the metadata envelope the same way (`meta/real.rotating`).
    /// 5. Commit: copy every shadow object onto its final name and delete
    ///    the shadow (a same-key ciphertext copy — no decryption needed, so
    ///    this phase is resumable from the journal without `old_secret`).
    /// 6. Swap the registry (`registry.rotate`, which also clears the decoy
    ///    verifier) and delete `meta/decoy`.
    /// 7. Delete the journal, zero both keys, drop the session (force
    ///    re-unlock under `new_secret`).
    ///
    /// # Errors
    /// `VaultError::Locked`, `VaultError::DecoyForbidden`,
    /// `VaultError::InvalidCredential` if `old_secret` is wrong,
    /// `VaultError::ConstraintViolated` for a malformed `new_secret`,
    /// `VaultError::Cancelled`, or a crypto/IO error from the staging phase
    /// (in which case the journal and any shadow objects are cleaned up and
    /// the vault is left exactly as it was under `old_secret`).
    #[instrument(skip(self, old_secret, new_secret, progress))]
    #[allow(clippy::too_many_lines)]
    pub fn rotate(
        &self,
        old_secret: &[u8],
        new_secret: &[u8],
        new_lock_type: LockType,
        progress: Option<&(dyn Fn(RotationProgress) + Send + Sync)>,
        cancel: Option<&CancelToken>,
    ) -> Result<(), VaultError> {
        new_lock_type.validate(new_secret)?;

        // Phase 0: validate state, re-verify old_secret, snapshot what we
        // need, then release the lock before the (potentially long) staging
        // phase — per spec §5, the manager must not hold the lock across
        // progress callbacks.
        let (old_key, new_key, index, journal) = {
            let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
            require_real(&inner)?;

            let salt = inner.registry.get_salt()?;
            let params = inner.registry.kdf_params()?;
            let verifier = crypto::derive_verifier(old_secret, &salt, &params)?;
            if inner.registry.identify(&verifier) != Some(RegistryIdentity::Real) {
                return Err(VaultError::InvalidCredential);
            }

            let old_key = crypto::derive_key(old_secret, &salt, &params)?;
            let raw = self.store.get(META_REAL)?;
            let envelope = crypto::Envelope::from_bytes(&raw)?;
            let plaintext = crypto::decrypt(&envelope, old_key.expose())?;
            let index = MetadataIndex::decode(plaintext.expose(), self.config.metadata_bound_bytes)?;

            let mut new_salt = [0u8; 16];
            OsRng.fill_bytes(&mut new_salt);
            let new_params = self.config.effective_kdf_params();
            let new_verifier_real = crypto::derive_verifier(new_secret, &new_salt, &new_params)?;
            let new_key = crypto::derive_key(new_secret, &new_salt, &new_params)?;

            let journal = RotationJournal {
                new_salt: new_salt.to_vec(),
                new_verifier_real,
                new_lock_type,
                new_kdf_params: new_params,
                total_ids: index.ids(),
                committing: false,
            };
            self.persist_journal(&journal)?;

            // Drop the just-derived real session to avoid two live data
            // keys during the staging phase; it is reconstructed from the
            // new secret only after the commit succeeds.
            inner.session = None;

            (old_key, new_key, index, journal)
        };

        info!(items = journal.total_ids.len(), "rotation staging begin");

        let stage_result = self.stage_rotation(&journal, &old_key, &new_key, progress, cancel);
        drop(old_key);

        if let Err(e) = stage_result {
            warn!(error = %e, "rotation aborted during staging, rolling back shadow objects");
            self.cleanup_shadows(&journal.total_ids);
            let _ = self.store.delete(ROTATION_JOURNAL);
            drop(new_key);
            return Err(e);
        }

        // Stage the metadata envelope under new_key.
        let plaintext = index.encode()?;
        let envelope = crypto::encrypt(&plaintext, new_key.expose())?;
        if let Err(e) = self.store.put(&shadow_name(META_REAL), &envelope.to_bytes()) {
            self.cleanup_shadows(&journal.total_ids);
            let _ = self.store.delete(ROTATION_JOURNAL);
            drop(new_key);
            return Err(e);
        }
        drop(new_key);

        // Past this point, shadow objects start getting copied onto their
        // final `file/<id>`/`meta/real` names under new_key — the point of
        // no return. Persist that before committing a single one, so a
        // crash mid-commit leaves a journal that recovery must finish
        // forward rather than abandon.
        let mut journal = journal;
        journal.committing = true;
        self.persist_journal(&journal)?;

        self.commit_rotation(&journal)?;

        // Per spec §4.5 step 6: the old decoy verifier/key are unreachable
        // once the salt changes, so its files become permanent garbage.
        // Collect them by set-subtraction against the real id set rather
        // than by decrypting the decoy index — see `sweep_unreferenced_files`.
        let keep: std::collections::HashSet<String> = journal
            .total_ids
            .iter()
            .map(VaultId::object_name)
            .collect();
        self.sweep_unreferenced_files(&keep);

        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        inner.registry.rotate(
            &journal.new_salt,
            &journal.new_verifier_real,
            journal.new_lock_type,
            journal.new_kdf_params.clone(),
        )?;
        let _ = self.store.delete(META_DECOY);
        self.store.delete(ROTATION_JOURNAL)?;
        inner.session = None;

        info!("rotation complete, vault relocked under new secret");
        Ok(())
    }

    /// Stage every id in `journal.total_ids` into its `.rotating` shadow,
    /// parallelized over a worker pool bounded by `config.rotation_workers`.
    fn stage_rotation(
        &self,
        journal: &RotationJournal,
        old_key: &securevault_crypto_core::SecretBytes<32>,
        new_key: &securevault_crypto_core::SecretBytes<32>,
        progress: Option<&(dyn Fn(RotationProgress) + Send + Sync)>,
        cancel: Option<&CancelToken>,
    ) -> Result<(), VaultError> {
        let total = journal.total_ids.len();
        let done = AtomicUsize::new(0);

        let workers = self
            .config
            .rotation_workers
            .or_else(|| std::thread::available_parallelism().ok().map(std::num::NonZero::get))
            .unwrap_or(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| VaultError::ConstraintViolated(format!("rotation pool: {e}")))?;

        pool.install(|| -> Result<(), VaultError> {
            use rayon::prelude::*;
            journal.total_ids.par_iter().try_for_each(|id| {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Err(VaultError::Cancelled);
                }
                self.stage_one(*id, old_key, new_key, self.config.rotation_retries)?;
                let n = done.fetch_add(1, Ordering::SeqCst).saturating_add(1);
                if let Some(cb) = progress {
                    cb(RotationProgress { done: n, total });
                }
                Ok(())
            })
        })
    }

    /// Stage a single id, retrying up to `retries` times on transient
    /// failure before giving up.
    fn stage_one(
        &self,
        id: VaultId,
        old_key: &securevault_crypto_core::SecretBytes<32>,
        new_key: &securevault_crypto_core::SecretBytes<32>,
        retries: u32,
    ) -> Result<(), VaultError> {
        let mut last_err = None;
        for _ in 0..=retries {
            match self.try_stage_one(id, old_key, new_key) {
                Ok(()) => return Ok(()),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or(VaultError::NotFound(id.object_name())))
    }

    fn try_stage_one(
        &self,
        id: VaultId,
        old_key: &securevault_crypto_core::SecretBytes<32>,
        new_key: &securevault_crypto_core::SecretBytes<32>,
    ) -> Result<(), VaultError> {
        let raw = self.store.get(&id.object_name())?;
        let envelope = crypto::Envelope::from_bytes(&raw)?;
        let plaintext = crypto::decrypt(&envelope, old_key.expose())?;
        let re_envelope = crypto::encrypt(plaintext.expose(), new_key.expose())?;
        self.store
            .put(&shadow_name(&id.object_name()), &re_envelope.to_bytes())
    }

    /// Copy every staged shadow object onto its final name. Ciphertext-only
    /// — safe to resume with no key material, which is what makes this
    /// phase recoverable from [`Self::recover_rotation`] using only the
    /// secret the user supplies at the next unlock.
    fn commit_rotation(&self, journal: &RotationJournal) -> Result<(), VaultError> {
        for id in &journal.total_ids {
            self.commit_shadow(&id.object_name())?;
        }
        self.commit_shadow(META_REAL)?;
        Ok(())
    }

    fn commit_shadow(&self, final_name: &str) -> Result<(), VaultError> {
        let shadow = shadow_name(final_name);
        match self.store.get(&shadow) {
            Ok(bytes) => {
                self.store.put(final_name, &bytes)?;
                self.store.delete(&shadow)
            }
            // Already committed by a previous (interrupted) recovery pass.
            Err(VaultError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn cleanup_shadows(&self, ids: &[VaultId]) {
        for id in ids {
            let _ = self.store.delete(&shadow_name(&id.object_name()));
        }
        let _ = self.store.delete(&shadow_name(META_REAL));
    }

    fn persist_journal(&self, journal: &RotationJournal) -> Result<(), VaultError> {
        let bytes = serde_json::to_vec(journal)
            .map_err(|e| VaultError::ConstraintViolated(format!("journal encode: {e}")))?;
        self.store.put(ROTATION_JOURNAL, &bytes)
    }

    fn load_journal(&self) -> Result<Option<RotationJournal>, VaultError> {
        match self.store.get(ROTATION_JOURNAL) {
            Ok(bytes) => {
                let journal = serde_json::from_slice(&bytes)
                    .map_err(|e| VaultError::ConstraintViolated(format!("journal decode: {e}")))?;
                Ok(Some(journal))
            }
            Err(VaultError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Called at the top of [`Self::unlock`]: resolves any interrupted
    /// rotation before the ordinary unlock path runs. See the module-level
    /// commentary on [`Self::rotate`] for why this needs no key material
    /// beyond whichever secret the caller just supplied.
    fn recover_rotation(&self, inner: &mut Inner, secret: &[u8]) -> Result<(), VaultError> {
        let Some(journal) = self.load_journal()? else {
            return Ok(());
        };

        if journal.committing {
            // The commit phase had already begun: some `file/<id>` or
            // `meta/real` objects may already be new_key ciphertext with no
            // old_key-readable original left, regardless of which secret
            // was just supplied. Abandoning here would discard the only
            // record of which objects still need migrating, so finish the
            // migration forward unconditionally; `commit_rotation` and the
            // registry swap are both idempotent against a partially-applied
            // prior attempt.
            info!("resuming interrupted rotation: commit phase already began, finishing forward");
            self.finish_rotation_commit(inner, &journal)?;
            return Ok(());
        }

        let new_verifier = crypto::derive_verifier(secret, &journal.new_salt, &journal.new_kdf_params)?;
        if constant_time_eq(&new_verifier, &journal.new_verifier_real) {
            info!("resuming interrupted rotation: new secret supplied, committing");
            self.finish_rotation_commit(inner, &journal)?;
            return Ok(());
        }

        // Staging phase only — nothing has been committed yet, so the
        // originals under old_key are all still intact. Safe to abandon if
        // this is the old (still-current) secret.
        let old_salt = inner.registry.get_salt()?;
        let old_params = inner.registry.kdf_params()?;
        let old_verifier = crypto::derive_verifier(secret, &old_salt, &old_params)?;
        if inner.registry.identify(&old_verifier).is_some() {
            info!("abandoning interrupted rotation: old secret supplied, cleaning up shadows");
            self.cleanup_shadows(&journal.total_ids);
            let _ = self.store.delete(ROTATION_JOURNAL);
            return Ok(());
        }

        // Neither old nor new — leave the journal and shadows untouched so
        // a later attempt with the right secret can still resolve it.
        Ok(())
    }

    /// Finish an in-progress (or already-complete) commit: copy every
    /// remaining shadow onto its final name, then swap the registry onto
    /// the new salt/verifier if it hasn't been already, and drop the
    /// journal. Safe to call more than once for the same journal.
    fn finish_rotation_commit(
        &self,
        inner: &mut Inner,
        journal: &RotationJournal,
    ) -> Result<(), VaultError> {
        self.commit_rotation(journal)?;
        if inner.registry.identify(&journal.new_verifier_real) != Some(RegistryIdentity::Real) {
            inner.registry.rotate(
                &journal.new_salt,
                &journal.new_verifier_real,
                journal.new_lock_type,
                journal.new_kdf_params.clone(),
            )?;
            let _ = self.store.delete(META_DECOY);
        }
        self.store.delete(ROTATION_JOURNAL)
    }

    // -----------------------------------------------------------------
    // reset
    // -----------------------------------------------------------------

    /// `LOCKED --reset(secret)--> WIPED --> UNINITIALIZED`.
    ///
    /// Per spec §4.5's decoy semantics ("an UNLOCKED_DECOY session MUST NOT
    /// be able to ... reset the vault"), a live decoy session is rejected
    /// with `DecoyForbidden` rather than the generic `ConstraintViolated`
    /// a live real session gets — reset is only ever reachable from LOCKED.
    ///
    /// # Errors
    /// `VaultError::DecoyForbidden` if called from the decoy session,
    /// `VaultError::ConstraintViolated` if the real session is still
    /// unlocked, `VaultError::InvalidCredential` if `secret` does not
    /// identify as the real identity.
    #[instrument(skip(self, secret))]
    pub fn reset(&self, secret: &[u8]) -> Result<(), VaultError> {
        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        match inner.session.as_ref().map(Session::identity) {
            Some(Identity::Decoy) => return Err(VaultError::DecoyForbidden),
            Some(Identity::Real) => {
                return Err(VaultError::ConstraintViolated(
                    "reset requires a locked session".into(),
                ))
            }
            None => {}
        }
        if !inner.registry.is_initialized() {
            return Err(VaultError::NotInitialized);
        }

        let salt = inner.registry.get_salt()?;
        let params = inner.registry.kdf_params()?;
        let verifier = crypto::derive_verifier(secret, &salt, &params)?;
        if inner.registry.identify(&verifier) != Some(RegistryIdentity::Real) {
            return Err(VaultError::InvalidCredential);
        }

        self.store.wipe_tree()?;
        inner.registry.wipe()?;

        info!("vault reset: object tree and registry wiped");
        Ok(())
    }

    // -----------------------------------------------------------------
    // biometric / intruder settings passthroughs (opaque to the core)
    // -----------------------------------------------------------------

    #[must_use]
    pub fn biometric_enabled(&self) -> bool {
        let inner = self.inner.lock().expect("vault manager mutex poisoned");
        inner.registry.biometric_enabled()
    }

    pub fn set_biometric_enabled(&self, enabled: bool) -> Result<(), VaultError> {
        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        inner.registry.set_biometric_enabled(enabled)
    }

    pub fn intruder_settings(&self) -> Option<String> {
        let inner = self.inner.lock().expect("vault manager mutex poisoned");
        inner.registry.intruder_settings().map(str::to_string)
    }

    pub fn set_intruder_settings(&self, settings: Option<String>) -> Result<(), VaultError> {
        let mut inner = self.inner.lock().expect("vault manager mutex poisoned");
        inner.registry.set_intruder_settings(settings)
    }
}

fn require_real(inner: &Inner) -> Result<(), VaultError> {
    match inner.session.as_ref().map(Session::identity) {
        None => Err(VaultError::Locked),
        Some(Identity::Decoy) => Err(VaultError::DecoyForbidden),
        Some(Identity::Real) => Ok(()),
    }
}

fn shadow_name(final_name: &str) -> String {
    format!("{final_name}{ROTATING_SUFFIX}")
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Constant-time equality, mirroring `registry::constant_time_eq` — kept
/// local since the journal's verifier check happens before a registry is
/// necessarily available for comparison.
fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::MemObjectStore;

    /// Cheap Argon2id parameters for tests — real presets would make a
    /// suite exercising many `init`/`unlock`/`rotate` cycles prohibitively
    /// slow. Mirrors the teacher's own `test_calibrated()` convention.
    fn test_params() -> Argon2idParams {
        Argon2idParams {
            m_cost: 32,
            t_cost: 1,
            p_cost: 1,
        }
    }

    fn manager() -> VaultManager {
        let mut config = VaultConfig::new("/tmp/securevault-test-unused");
        config.kdf_params_override = Some(test_params());
        VaultManager::open(config, Box::new(MemObjectStore::new())).expect("open should succeed")
    }

    #[test]
    fn fresh_manager_is_uninitialized() {
        let mgr = manager();
        assert_eq!(mgr.state(), VaultState::Uninitialized);
        assert!(!mgr.is_initialized());
    }

    #[test]
    fn init_then_unlock_real_with_empty_list() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        assert_eq!(mgr.state(), VaultState::Locked);

        let identity = mgr
            .unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        assert_eq!(identity, Identity::Real);
        assert_eq!(mgr.state(), VaultState::UnlockedReal);
        assert!(mgr.list().expect("list should succeed").is_empty());
    }

    #[test]
    fn wrong_secret_is_rejected_without_lockout() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");

        let err = mgr.unlock(b"wrong").expect_err("wrong secret should fail");
        assert!(matches!(err, VaultError::InvalidCredential));

        let identity = mgr
            .unlock(b"correct horse battery staple")
            .expect("correct secret should still work");
        assert_eq!(identity, Identity::Real);
    }

    #[test]
    fn correct_secret_always_unlocks_even_after_many_failed_attempts() {
        // spec §2: unlock after a wrong secret always succeeds with the
        // correct one (no lockout in the core) — `unlock_cooldown_enabled`
        // defaults to false, so this must hold past the cooldown's own
        // attempt thresholds, not just below them.
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");

        for _ in 0..10 {
            let err = mgr.unlock(b"wrong").expect_err("wrong secret should fail");
            assert!(matches!(err, VaultError::InvalidCredential));
        }

        let identity = mgr
            .unlock(b"correct horse battery staple")
            .expect("correct secret must unlock regardless of prior failed attempts");
        assert_eq!(identity, Identity::Real);
    }

    #[test]
    fn rotation_recovery_finishes_forward_once_commit_phase_had_begun() {
        // Reproduces an interruption inside `commit_rotation`: one file
        // envelope has already been rewritten under new_key and committed
        // to its final name, but `meta/real` is still staged (not yet
        // committed) and the registry has not been rotated. The old secret
        // still "identifies" against the stale registry, but abandoning at
        // this point would strand the already-migrated file. Recovery must
        // always finish forward once `committing` is set.
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        let x = mgr
            .import(b"hello", "greet.txt", "text/plain")
            .expect("import should succeed");
        mgr.lock();

        let params = test_params();
        let old_salt = {
            let inner = mgr.inner.lock().expect("lock");
            inner.registry.get_salt().expect("salt")
        };
        let old_key = crypto::derive_key(b"correct horse battery staple", &old_salt, &params)
            .expect("derive old key");
        let new_salt = [7u8; 16];
        let new_key = crypto::derive_key(b"p@ssw0rd-2025", &new_salt, &params)
            .expect("derive new key");
        let new_verifier_real = crypto::derive_verifier(b"p@ssw0rd-2025", &new_salt, &params)
            .expect("derive new verifier");

        let journal = RotationJournal {
            new_salt: new_salt.to_vec(),
            new_verifier_real,
            new_lock_type: LockType::Password,
            new_kdf_params: params,
            total_ids: vec![x.id],
            committing: true,
        };
        mgr.persist_journal(&journal).expect("persist journal");

        // Stage and commit the one file's envelope onto file/<id> — the
        // first of the two objects `commit_rotation` would migrate.
        mgr.stage_one(x.id, &old_key, &new_key, 0)
            .expect("stage file shadow");
        mgr.commit_shadow(&x.id.object_name())
            .expect("commit file shadow onto its final name");

        // Stage (but do not yet commit) meta/real's shadow — the crash
        // lands between the two `commit_shadow` calls inside
        // `commit_rotation`.
        let mut index = MetadataIndex::new();
        index.push_front(VaultItem {
            id: x.id,
            original_name: x.original_name.clone(),
            mime_type: x.mime_type.clone(),
            size: x.size,
            imported_at: x.imported_at,
        });
        let plaintext = index.encode().expect("encode metadata");
        let envelope = crypto::encrypt(&plaintext, new_key.expose()).expect("encrypt meta");
        mgr.store
            .put(&shadow_name(META_REAL), &envelope.to_bytes())
            .expect("stage meta shadow");

        // The registry still names the OLD identity, and the old secret
        // would naively "match" it — but file/<id> is already new_key
        // ciphertext and unreadable with old_key. Recovery must not honor
        // that match; it must finish the migration forward instead.
        let old_attempt = mgr.unlock(b"correct horse battery staple");
        assert!(matches!(old_attempt, Err(VaultError::InvalidCredential)));

        let identity = mgr
            .unlock(b"p@ssw0rd-2025")
            .expect("new secret should unlock once recovery has finished forward");
        assert_eq!(identity, Identity::Real);
        assert_eq!(
            mgr.preview(x.id).expect("preview should still decrypt").bytes(),
            b"hello"
        );
    }

    #[test]
    fn import_then_preview_roundtrips() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");

        let item = mgr
            .import(b"hello", "greet.txt", "text/plain")
            .expect("import should succeed");
        assert_eq!(item.size, 5);

        mgr.lock();
        mgr.unlock(b"correct horse battery staple")
            .expect("relock+unlock should succeed");

        let items = mgr.list().expect("list should succeed");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, item.id);

        let preview = mgr.preview(item.id).expect("preview should succeed");
        assert_eq!(preview.bytes(), b"hello");
    }

    #[test]
    fn decoy_sessions_are_disjoint_from_real() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        mgr.import(b"hello", "greet.txt", "text/plain")
            .expect("import should succeed");
        mgr.set_decoy(b"000000").expect("set_decoy should succeed");
        mgr.lock();

        let identity = mgr.unlock(b"000000").expect("decoy unlock should succeed");
        assert_eq!(identity, Identity::Decoy);
        assert!(mgr.list().expect("list should succeed").is_empty());

        mgr.import(b"lie", "note.txt", "text/plain")
            .expect("decoy import should succeed");
        mgr.lock();

        let identity = mgr
            .unlock(b"correct horse battery staple")
            .expect("real unlock should succeed");
        assert_eq!(identity, Identity::Real);
        let items = mgr.list().expect("list should succeed");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].original_name, "greet.txt");
    }

    #[test]
    fn remove_decoy_sweeps_decoy_only_files() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        let real_item = mgr
            .import(b"hello", "greet.txt", "text/plain")
            .expect("import should succeed");
        mgr.set_decoy(b"000000").expect("set_decoy should succeed");
        mgr.lock();

        mgr.unlock(b"000000").expect("decoy unlock should succeed");
        mgr.import(b"lie", "note.txt", "text/plain")
            .expect("decoy import should succeed");
        mgr.lock();

        mgr.unlock(b"correct horse battery staple")
            .expect("real unlock should succeed");
        mgr.remove_decoy().expect("remove_decoy should succeed");

        let names = mgr
            .store
            .list(crate::object_store::FILE_PREFIX)
            .expect("list should succeed");
        assert_eq!(names, vec![real_item.id.object_name()]);
    }

    #[test]
    fn decoy_session_forbids_privileged_operations() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        mgr.set_decoy(b"000000").expect("set_decoy should succeed");
        mgr.lock();
        mgr.unlock(b"000000").expect("decoy unlock should succeed");

        assert!(matches!(
            mgr.rotate(b"000000", b"p@ssw0rd-2025", LockType::Password, None, None),
            Err(VaultError::DecoyForbidden)
        ));
        assert!(matches!(
            mgr.set_decoy(b"111111"),
            Err(VaultError::DecoyForbidden)
        ));
        assert!(matches!(
            mgr.remove_decoy(),
            Err(VaultError::DecoyForbidden)
        ));
        assert!(matches!(
            mgr.reset(b"000000"),
            Err(VaultError::DecoyForbidden)
        ));
    }

    #[test]
    fn rotate_preserves_content_and_invalidates_old_secret() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        let x = mgr
            .import(b"hello", "greet.txt", "text/plain")
            .expect("import should succeed");
        let y = mgr
            .import(b"world", "w.txt", "text/plain")
            .expect("import should succeed");

        mgr.rotate(
            b"correct horse battery staple",
            b"p@ssw0rd-2025",
            LockType::Password,
            None,
            None,
        )
        .expect("rotate should succeed");
        assert_eq!(mgr.state(), VaultState::Locked);

        assert!(matches!(
            mgr.unlock(b"correct horse battery staple"),
            Err(VaultError::InvalidCredential)
        ));
        mgr.unlock(b"p@ssw0rd-2025")
            .expect("new secret should unlock");

        assert_eq!(mgr.preview(x.id).expect("preview x").bytes(), b"hello");
        assert_eq!(mgr.preview(y.id).expect("preview y").bytes(), b"world");
    }

    #[test]
    fn rotate_wipes_decoy_and_sweeps_its_files() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        let real_item = mgr
            .import(b"hello", "greet.txt", "text/plain")
            .expect("import should succeed");
        mgr.set_decoy(b"000000").expect("set_decoy should succeed");
        mgr.lock();
        mgr.unlock(b"000000").expect("decoy unlock should succeed");
        mgr.import(b"lie", "note.txt", "text/plain")
            .expect("decoy import should succeed");
        mgr.lock();
        mgr.unlock(b"correct horse battery staple")
            .expect("real unlock should succeed");

        mgr.rotate(
            b"correct horse battery staple",
            b"p@ssw0rd-2025",
            LockType::Password,
            None,
            None,
        )
        .expect("rotate should succeed");

        assert!(matches!(
            mgr.unlock(b"000000"),
            Err(VaultError::InvalidCredential)
        ));
        let names = mgr
            .store
            .list(crate::object_store::FILE_PREFIX)
            .expect("list should succeed");
        assert_eq!(names, vec![real_item.id.object_name()]);
    }

    #[test]
    fn tamper_detection_leaves_index_intact() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        let x = mgr
            .import(b"hello", "greet.txt", "text/plain")
            .expect("import should succeed");

        let mut raw = mgr.store.get(&x.id.object_name()).expect("get should succeed");
        raw[20] ^= 0xFF;
        mgr.store.put(&x.id.object_name(), &raw).expect("put should succeed");

        assert!(matches!(mgr.preview(x.id), Err(VaultError::Crypto(_))));
        let items = mgr.list().expect("list should succeed");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, x.id);
    }

    #[test]
    fn reset_wipes_everything() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        mgr.import(b"hello", "greet.txt", "text/plain")
            .expect("import should succeed");
        mgr.lock();

        mgr.reset(b"correct horse battery staple")
            .expect("reset should succeed");
        assert!(!mgr.is_initialized());
        assert!(mgr.store.list("file").expect("list should succeed").is_empty());
        assert!(matches!(
            mgr.unlock(b"correct horse battery staple"),
            Err(VaultError::NotInitialized)
        ));
    }

    #[test]
    fn lock_clears_session_debug_hook() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        assert!(mgr.debug_has_live_session());
        mgr.lock();
        assert!(!mgr.debug_has_live_session());
    }

    #[test]
    fn double_unlock_is_rejected() {
        let mgr = manager();
        mgr.init(b"correct horse battery staple", LockType::Password)
            .expect("init should succeed");
        mgr.unlock(b"correct horse battery staple")
            .expect("unlock should succeed");
        assert!(matches!(
            mgr.unlock(b"correct horse battery staple"),
            Err(VaultError::ConstraintViolated(_))
        ));
    }
}
