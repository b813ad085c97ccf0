//! Vault configuration.
//!
//! `VaultConfig` is passed explicitly to [`crate::manager::VaultManager`]
//! constructors rather than read from implicit global state — there is no
//! ambient singleton to configure.

use securevault_crypto_core::{Argon2idParams, KdfPreset};
use std::path::PathBuf;

/// Default bound on decoded metadata envelope size, per spec §6.
pub const DEFAULT_METADATA_BOUND_BYTES: usize = 4 * 1024 * 1024;

/// Default number of retries attempted per file during rotation before the
/// rotation protocol aborts and rolls back.
pub const DEFAULT_ROTATION_RETRIES: u32 = 3;

/// Vault-wide configuration, resolved once at construction time.
#[derive(Clone, Debug)]
pub struct VaultConfig {
    /// Root directory for the private application directory. The object
    /// store and credential registry both live under this path.
    pub root: PathBuf,
    /// KDF preset used for ordinary unlock/init/rotate operations.
    pub preset: KdfPreset,
    /// Overrides `preset.default_params()` when set. Production callers
    /// leave this `None`; test helpers set it to a cheap parameter set so
    /// suites that exercise many `init`/`unlock`/`rotate` cycles don't pay
    /// Argon2id's real-world cost on every call.
    pub kdf_params_override: Option<Argon2idParams>,
    /// Maximum allowed decoded size of a metadata envelope.
    pub metadata_bound_bytes: usize,
    /// Number of per-file retries during rotation before aborting.
    pub rotation_retries: u32,
    /// Upper bound on the rotation worker pool's thread count. `None` lets
    /// the pool size itself to `std::thread::available_parallelism()`.
    pub rotation_workers: Option<usize>,
    /// Enables the registry's failed-attempt cooldown on `unlock`. Off by
    /// default: spec §2 requires the correct secret to always unlock, and
    /// the cooldown (checked before the secret is even identified) would
    /// otherwise also lock out the legitimate user after enough wrong
    /// guesses. Callers outside the core that accept the tradeoff — e.g. a
    /// GUI that wants brute-force throttling at the cost of occasionally
    /// delaying its own user — can opt in explicitly.
    pub unlock_cooldown_enabled: bool,
}

impl VaultConfig {
    /// Build a config rooted at `root` with every other field defaulted.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            preset: KdfPreset::Balanced,
            kdf_params_override: None,
            metadata_bound_bytes: DEFAULT_METADATA_BOUND_BYTES,
            rotation_retries: DEFAULT_ROTATION_RETRIES,
            rotation_workers: None,
            unlock_cooldown_enabled: false,
        }
    }

    /// The Argon2id parameters this config currently resolves to:
    /// [`Self::kdf_params_override`] if set, otherwise `preset`'s defaults.
    #[must_use]
    pub fn effective_kdf_params(&self) -> Argon2idParams {
        self.kdf_params_override
            .clone()
            .unwrap_or_else(|| self.preset.default_params())
    }
}
