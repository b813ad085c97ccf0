//! C4 — Credential Registry: the persisted Auth Record.
//!
//! Persisted outside the encrypted object tree as a plaintext key/value
//! store — it must be readable before any secret is known. Because it
//! stores only a salt and domain-separated verifiers (never a key), this
//! is safe per spec §4.4.

use data_encoding::BASE64;
use securevault_crypto_core::Argon2idParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::error::VaultError;
use crate::object_store::ensure_parent_dir;

/// The registry's lock-type tag. Advisory only — the KDF never branches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockType {
    Pin,
    Password,
}

impl LockType {
    /// Validate `secret` against this lock type's shape constraint.
    ///
    /// # Errors
    /// Returns `VaultError::ConstraintViolated` if a PIN is not exactly six
    /// ASCII digits, or a password is shorter than 8 bytes.
    pub fn validate(self, secret: &[u8]) -> Result<(), VaultError> {
        match self {
            Self::Pin => {
                if secret.len() != 6 || !secret.iter().all(u8::is_ascii_digit) {
                    return Err(VaultError::ConstraintViolated(
                        "PIN must be exactly 6 decimal digits".into(),
                    ));
                }
            }
            Self::Password => {
                if secret.len() < 8 {
                    return Err(VaultError::ConstraintViolated(
                        "password must be at least 8 bytes".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Which stored identity a verifier matched, or neither.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Identity {
    Real,
    Decoy,
}

/// The persisted Auth Record (spec §3), serialized as JSON with binary
/// fields base64-encoded.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct AuthRecord {
    salt: String,
    verifier_real: Option<String>,
    verifier_decoy: Option<String>,
    lock_type: Option<LockType>,
    kdf_params: Option<Argon2idParams>,
    biometric_enabled: bool,
    intruder_settings: Option<String>,
    unlock_attempts: u32,
    last_attempt_at: Option<u64>,
}

impl AuthRecord {
    fn empty() -> Self {
        Self {
            salt: String::new(),
            verifier_real: None,
            verifier_decoy: None,
            lock_type: None,
            kdf_params: None,
            biometric_enabled: false,
            intruder_settings: None,
            unlock_attempts: 0,
            last_attempt_at: None,
        }
    }
}

/// The Credential Registry: owns the persisted Auth Record.
pub struct CredentialRegistry {
    path: PathBuf,
    record: AuthRecord,
}

impl CredentialRegistry {
    /// Open the registry file at `path`, loading any existing record, or
    /// starting from an empty (not-initialized) one if the file is absent.
    ///
    /// # Errors
    /// Returns `VaultError::Io` or a JSON parse error wrapped as
    /// `VaultError::ConstraintViolated` if the file exists but is corrupt.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let path = path.into();
        let record = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                VaultError::ConstraintViolated(format!("registry corrupted: {e}"))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AuthRecord::empty(),
            Err(e) => return Err(VaultError::Io(e)),
        };
        Ok(Self { path, record })
    }

    fn persist(&self) -> Result<(), VaultError> {
        ensure_parent_dir(&self.path)?;
        let bytes = serde_json::to_vec_pretty(&self.record)
            .map_err(|e| VaultError::ConstraintViolated(format!("registry serialize: {e}")))?;
        let dir = self
            .path
            .parent()
            .ok_or_else(|| VaultError::ConstraintViolated("registry path has no parent".into()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, &bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| VaultError::Io(e.error))?;
        Ok(())
    }

    /// `is_initialized() -> bool`
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.record.verifier_real.is_some()
    }

    /// `init(salt, verifier_real, lock_type)`
    ///
    /// # Errors
    /// Returns `VaultError::AlreadyInitialized` if a real verifier already exists.
    pub fn init(
        &mut self,
        salt: &[u8],
        verifier_real: &[u8; 32],
        lock_type: LockType,
        kdf_params: Argon2idParams,
    ) -> Result<(), VaultError> {
        if self.is_initialized() {
            return Err(VaultError::AlreadyInitialized);
        }
        self.record.salt = BASE64.encode(salt);
        self.record.verifier_real = Some(BASE64.encode(verifier_real));
        self.record.lock_type = Some(lock_type);
        self.record.kdf_params = Some(kdf_params);
        self.record.unlock_attempts = 0;
        self.record.last_attempt_at = None;
        self.persist()
    }

    /// `identify(verifier_candidate) -> REAL | DECOY | None`, constant-time.
    #[must_use]
    pub fn identify(&self, verifier_candidate: &[u8; 32]) -> Option<Identity> {
        let real_matches = self
            .record
            .verifier_real
            .as_deref()
            .and_then(|s| BASE64.decode(s.as_bytes()).ok())
            .is_some_and(|stored| constant_time_eq(&stored, verifier_candidate));

        let decoy_matches = self
            .record
            .verifier_decoy
            .as_deref()
            .and_then(|s| BASE64.decode(s.as_bytes()).ok())
            .is_some_and(|stored| constant_time_eq(&stored, verifier_candidate));

        // Evaluate both branches unconditionally above so that matching the
        // decoy takes the same time as matching the real identity.
        if real_matches {
            Some(Identity::Real)
        } else if decoy_matches {
            Some(Identity::Decoy)
        } else {
            None
        }
    }

    /// `get_salt() -> bytes`
    ///
    /// # Errors
    /// Returns `VaultError::NotInitialized` if no salt has been set yet.
    pub fn get_salt(&self) -> Result<Vec<u8>, VaultError> {
        if self.record.salt.is_empty() {
            return Err(VaultError::NotInitialized);
        }
        BASE64
            .decode(self.record.salt.as_bytes())
            .map_err(|e| VaultError::ConstraintViolated(format!("salt decode: {e}")))
    }

    /// `get_lock_type() -> PIN | PASSWORD`
    ///
    /// # Errors
    /// Returns `VaultError::NotInitialized` if the vault has no lock type set.
    pub fn get_lock_type(&self) -> Result<LockType, VaultError> {
        self.record.lock_type.ok_or(VaultError::NotInitialized)
    }

    /// Current KDF parameters, if initialized.
    pub fn kdf_params(&self) -> Result<Argon2idParams, VaultError> {
        self.record.kdf_params.clone().ok_or(VaultError::NotInitialized)
    }

    /// `set_decoy(verifier_decoy)`
    ///
    /// # Errors
    /// Returns `VaultError::ConstraintViolated` if the decoy verifier equals
    /// the real verifier (spec §3 invariant).
    pub fn set_decoy(&mut self, verifier_decoy: &[u8; 32]) -> Result<(), VaultError> {
        let real = self
            .record
            .verifier_real
            .as_deref()
            .and_then(|s| BASE64.decode(s.as_bytes()).ok())
            .ok_or(VaultError::NotInitialized)?;
        if constant_time_eq(&real, verifier_decoy) {
            return Err(VaultError::ConstraintViolated(
                "decoy verifier must differ from the real verifier".into(),
            ));
        }
        self.record.verifier_decoy = Some(BASE64.encode(verifier_decoy));
        self.persist()
    }

    /// `clear_decoy()`
    pub fn clear_decoy(&mut self) -> Result<(), VaultError> {
        self.record.verifier_decoy = None;
        self.persist()
    }

    /// Whether a decoy identity is currently configured.
    #[must_use]
    pub fn has_decoy(&self) -> bool {
        self.record.verifier_decoy.is_some()
    }

    /// `rotate(new_salt, new_verifier_real, new_lock_type)` — also clears
    /// the decoy verifier, per spec §4.5 step 6.
    #[instrument(skip(self, new_salt, new_verifier_real))]
    pub fn rotate(
        &mut self,
        new_salt: &[u8],
        new_verifier_real: &[u8; 32],
        new_lock_type: LockType,
        new_kdf_params: Argon2idParams,
    ) -> Result<(), VaultError> {
        self.record.salt = BASE64.encode(new_salt);
        self.record.verifier_real = Some(BASE64.encode(new_verifier_real));
        self.record.lock_type = Some(new_lock_type);
        self.record.kdf_params = Some(new_kdf_params);
        self.record.verifier_decoy = None;
        self.record.unlock_attempts = 0;
        self.record.last_attempt_at = None;
        self.persist()
    }

    /// `wipe()` — erase everything, including the on-disk registry file.
    pub fn wipe(&mut self) -> Result<(), VaultError> {
        self.record = AuthRecord::empty();
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn biometric_enabled(&self) -> bool {
        self.record.biometric_enabled
    }

    pub fn set_biometric_enabled(&mut self, enabled: bool) -> Result<(), VaultError> {
        self.record.biometric_enabled = enabled;
        self.persist()
    }

    #[must_use]
    pub fn intruder_settings(&self) -> Option<&str> {
        self.record.intruder_settings.as_deref()
    }

    pub fn set_intruder_settings(&mut self, settings: Option<String>) -> Result<(), VaultError> {
        self.record.intruder_settings = settings;
        self.persist()
    }

    /// Defense-in-depth brute-force cooldown (open question 4): schedule
    /// of `(attempts_threshold, delay_ms)` pairs, checked in descending order.
    const BACKOFF_SCHEDULE: &'static [(u32, u64)] =
        &[(10, 300_000), (8, 30_000), (5, 5_000), (3, 1_000)];

    fn required_delay_ms(attempts: u32) -> u64 {
        for &(threshold, delay) in Self::BACKOFF_SCHEDULE {
            if attempts >= threshold {
                return delay;
            }
        }
        0
    }

    /// Returns `Some(remaining_ms)` if a cooldown is active, else `None`.
    #[must_use]
    pub fn check_cooldown(&self, now_secs: u64) -> Option<u64> {
        let delay_ms = Self::required_delay_ms(self.record.unlock_attempts);
        if delay_ms == 0 {
            return None;
        }
        let last_attempt = self.record.last_attempt_at?;
        let elapsed_ms = now_secs.saturating_sub(last_attempt).saturating_mul(1000);
        if elapsed_ms < delay_ms {
            Some(delay_ms.saturating_sub(elapsed_ms))
        } else {
            None
        }
    }

    /// Record a failed unlock attempt, persisting the updated counters.
    pub fn record_failed_attempt(&mut self, now_secs: u64) -> Result<(), VaultError> {
        self.record.unlock_attempts = self.record.unlock_attempts.saturating_add(1);
        self.record.last_attempt_at = Some(now_secs);
        self.persist()
    }

    /// Reset the failed-attempt counter after a successful unlock.
    pub fn reset_attempts(&mut self) -> Result<(), VaultError> {
        self.record.unlock_attempts = 0;
        self.record.last_attempt_at = None;
        self.persist()
    }
}

/// Constant-time equality over equal-length byte slices; unequal lengths
/// are reported as unequal immediately since lengths here are always
/// public (both sides are always 32-byte verifier hashes).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
