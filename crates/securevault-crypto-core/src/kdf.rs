//! Argon2id key derivation with tiered presets and domain-separated outputs.
//!
//! This module provides:
//! - [`derive_key`] — derive the 32-byte data key from a secret + salt
//! - [`derive_verifier`] — derive the 32-byte verifier hash from the same inputs
//! - [`calibrate`] — benchmark hardware and return achievable presets
//! - [`Argon2idParams`] — serializable parameter set (stored in the credential registry)
//! - [`KdfPreset`] — Fast / Balanced / Maximum preset selector
//!
//! # Domain separation
//!
//! Both outputs start from a single expensive Argon2id call over
//! `(secret, salt)` — running Argon2id twice per unlock would double the
//! attacker's and the user's cost for no security benefit. The 32-byte
//! Argon2id output is never itself exposed as a key or a verifier; instead
//! it is expanded through [`blake3::derive_key`] under two disjoint context
//! strings, one for the data key and one for the verifier. `derive_key`'s
//! context is `KEY_CONTEXT`, `derive_verifier`'s is `VERIFIER_CONTEXT`.
//! Because `blake3::derive_key` is a keyed PRF, observing one output gives
//! no information about the Argon2id master or the other context's output —
//! satisfying the spec's invariant `verifier != data key` even though both
//! trace back to the same expensive derivation.

use crate::error::CryptoError;
use crate::memory::SecretBytes;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Output length of the Argon2id master derivation, in bytes.
const MASTER_LEN: usize = 32;

/// Output length of the public KDF contract, in bytes (256 bits).
const OUTPUT_LEN: usize = 32;

/// Minimum salt length in bytes, per the data model (`Salt` is 16 bytes).
const MIN_SALT_LEN: usize = 16;

/// Domain-separation context for the data key.
const KEY_CONTEXT: &str = "securevault-datakey-v1";

/// Domain-separation context for the verifier hash.
const VERIFIER_CONTEXT: &str = "securevault-verifier-v1";

/// 512 MB in KiB.
const MEMORY_512MB: u32 = 524_288;

/// 256 MB in KiB.
const MEMORY_256MB: u32 = 262_144;

/// 128 MB in KiB — absolute minimum tier.
const MEMORY_128MB: u32 = 131_072;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Argon2id parameter set — stored in the credential registry.
///
/// Fields use the `argon2` crate convention:
/// - `m_cost`: memory in KiB (NOT bytes, NOT MB)
/// - `t_cost`: number of iterations
/// - `p_cost`: degree of parallelism
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2idParams {
    /// Memory cost in kibibytes (1 KiB = 1024 bytes).
    pub m_cost: u32,
    /// Number of iterations (time cost).
    pub t_cost: u32,
    /// Degree of parallelism (number of lanes).
    pub p_cost: u32,
}

impl Argon2idParams {
    /// The spec's floor: `m_cost >= 64 MiB`, `t_cost >= 3`.
    #[must_use]
    pub const fn meets_minimum(&self) -> bool {
        self.m_cost >= 65_536 && self.t_cost >= 3
    }
}

/// KDF preset selector.
///
/// Each preset has default (uncalibrated) parameters. Use [`calibrate`] to
/// get hardware-adapted versions before persisting them to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KdfPreset {
    /// Quick access on modest hardware (~1s target). Used for the PIN path.
    Fast,
    /// Recommended daily driver (~1.5-2s target). The default preset.
    Balanced,
    /// Maximum security, used for rotation and sensitive re-verification.
    Maximum,
}

impl KdfPreset {
    /// Return the default (uncalibrated) parameters for this preset.
    #[must_use]
    pub const fn default_params(self) -> Argon2idParams {
        match self {
            Self::Fast => Argon2idParams {
                m_cost: MEMORY_256MB,
                t_cost: 2,
                p_cost: 4,
            },
            Self::Balanced => Argon2idParams {
                m_cost: MEMORY_512MB,
                t_cost: 3,
                p_cost: 4,
            },
            Self::Maximum => Argon2idParams {
                m_cost: MEMORY_512MB,
                t_cost: 4,
                p_cost: 4,
            },
        }
    }
}

/// Result of hardware calibration — achievable parameters for all 3 presets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct CalibratedPresets {
    /// Fast preset (~1s target).
    pub fast: Argon2idParams,
    /// Balanced preset (~1.5-2s target).
    pub balanced: Argon2idParams,
    /// Maximum preset (~3-4s target).
    pub maximum: Argon2idParams,
}

// ---------------------------------------------------------------------------
// Core KDF
// ---------------------------------------------------------------------------

/// Derive the 32-byte data key for `(secret, salt)` under `params`.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if the salt is shorter than 16
/// bytes, the Argon2id parameters are invalid, or the derivation fails.
pub fn derive_key(
    secret: &[u8],
    salt: &[u8],
    params: &Argon2idParams,
) -> Result<SecretBytes<32>, CryptoError> {
    let master = argon2id_master(secret, salt, params)?;
    let expanded = blake3::derive_key(KEY_CONTEXT, master.expose());
    Ok(SecretBytes::new(expanded))
}

/// Derive the 32-byte verifier hash for `(secret, salt)` under `params`.
///
/// The verifier is safe to persist and compare in the clear: it cannot be
/// used to decrypt anything derived from [`derive_key`].
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` under the same conditions as
/// [`derive_key`].
pub fn derive_verifier(
    secret: &[u8],
    salt: &[u8],
    params: &Argon2idParams,
) -> Result<[u8; 32], CryptoError> {
    let master = argon2id_master(secret, salt, params)?;
    Ok(blake3::derive_key(VERIFIER_CONTEXT, master.expose()))
}

/// Run the single expensive Argon2id derivation shared by both public
/// functions above, returning the raw (non domain-separated) master bytes.
fn argon2id_master(
    secret: &[u8],
    salt: &[u8],
    params: &Argon2idParams,
) -> Result<SecretBytes<MASTER_LEN>, CryptoError> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "salt too short: {} bytes (minimum {MIN_SALT_LEN})",
            salt.len()
        )));
    }

    let argon2_params = argon2::Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(OUTPUT_LEN),
    )
    .map_err(|e| CryptoError::KeyDerivation(format!("invalid argon2 params: {e}")))?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let mut output = [0u8; MASTER_LEN];
    argon2
        .hash_password_into(secret, salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(format!("argon2id derivation failed: {e}")))?;

    let result = SecretBytes::new(output);
    output.zeroize();
    Ok(result)
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// Benchmark the current hardware and return achievable Argon2id presets.
///
/// Attempts the highest memory tier first (512 MB), cascading down to 256 MB
/// and 128 MB if allocation fails. Iterations are compensated when memory is
/// reduced to maintain equivalent brute-force resistance. Every tier still
/// satisfies [`Argon2idParams::meets_minimum`].
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if even 128 MB calibration fails.
pub fn calibrate() -> Result<CalibratedPresets, CryptoError> {
    let achievable_memory = find_achievable_memory()?;

    let fast = Argon2idParams {
        m_cost: core::cmp::min(achievable_memory, MEMORY_256MB),
        t_cost: scale_iterations(
            2,
            MEMORY_256MB,
            core::cmp::min(achievable_memory, MEMORY_256MB),
        ),
        p_cost: 4,
    };

    let balanced = Argon2idParams {
        m_cost: achievable_memory,
        t_cost: scale_iterations(3, MEMORY_512MB, achievable_memory),
        p_cost: 4,
    };

    let maximum = Argon2idParams {
        m_cost: achievable_memory,
        t_cost: scale_iterations(4, MEMORY_512MB, achievable_memory),
        p_cost: 4,
    };

    Ok(CalibratedPresets {
        fast,
        balanced,
        maximum,
    })
}

/// Attempt trial allocations to find the highest achievable memory tier.
fn find_achievable_memory() -> Result<u32, CryptoError> {
    if try_allocation(MEMORY_512MB) {
        return Ok(MEMORY_512MB);
    }
    if try_allocation(MEMORY_256MB) {
        return Ok(MEMORY_256MB);
    }
    if try_allocation(MEMORY_128MB) {
        return Ok(MEMORY_128MB);
    }
    Err(CryptoError::KeyDerivation(
        "calibration failed: unable to allocate even 128 MB for Argon2id".into(),
    ))
}

/// Test whether argon2 can allocate the given memory for a trial derivation.
///
/// Uses `catch_unwind` to handle OOM panics gracefully.
fn try_allocation(m_cost_kib: u32) -> bool {
    let result = std::panic::catch_unwind(|| {
        let Ok(params) = argon2::Params::new(m_cost_kib, 1, 4, Some(OUTPUT_LEN)) else {
            return false;
        };
        let argon2 =
            argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
        let mut out = [0u8; OUTPUT_LEN];
        let dummy_secret = b"calibration_probe";
        let dummy_salt = b"calibration_salt_16b";
        let ok = argon2
            .hash_password_into(dummy_secret, dummy_salt, &mut out)
            .is_ok();
        out.zeroize();
        ok
    });

    result.unwrap_or(false)
}

/// Scale iterations when memory is reduced.
///
/// When memory is halved, double the iterations to compensate.
const fn scale_iterations(base_t_cost: u32, target_memory: u32, actual_memory: u32) -> u32 {
    if actual_memory >= target_memory || actual_memory == 0 {
        return base_t_cost;
    }
    #[allow(clippy::arithmetic_side_effects)]
    let ratio = target_memory / actual_memory;
    base_t_cost.saturating_mul(ratio)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
