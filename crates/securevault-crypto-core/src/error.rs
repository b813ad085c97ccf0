//! Cryptographic error types for `securevault-crypto-core`.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key or verifier derivation failed (parameter validation, memory allocation).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Symmetric encryption/decryption failure (AES-256-GCM).
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authentication tag verification failed — ciphertext tampered or wrong key.
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    /// Invalid key material (wrong length, corrupted bytes).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Secure memory allocation failure (mlock, guard pages).
    #[error("secure memory error: {0}")]
    SecureMemory(String),

    /// Envelope parsing error — malformed or truncated on-disk bytes.
    #[error("envelope format error: {0}")]
    EnvelopeFormat(String),
}
