//! `securevault-crypto-core` — Pure cryptographic primitives for SecureVault.
//!
//! This crate is the audit target: zero network, zero async, zero filesystem
//! I/O. It implements key derivation (C1) and the AEAD envelope codec (C2);
//! everything that touches disk or orchestrates state lives in
//! `securevault-vault`.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod envelope;
pub mod error;
pub mod memory;

pub mod kdf;

pub use envelope::{decrypt, encrypt, Envelope, KEY_LEN, NONCE_LEN, OVERHEAD, TAG_LEN, VERSION};
pub use error::CryptoError;
pub use kdf::{calibrate, derive_key, derive_verifier, Argon2idParams, CalibratedPresets, KdfPreset};
pub use memory::{disable_core_dumps, LockedRegion, SecretBuffer, SecretBytes};
