//! AES-256-GCM authenticated encryption into the on-disk envelope format.
//!
//! This module provides:
//! - [`encrypt`] — encrypt plaintext with a random nonce, returning an [`Envelope`]
//! - [`decrypt`] — decrypt and authenticate an [`Envelope`], returning a [`SecretBuffer`]
//! - [`Envelope`] — the versioned, self-describing on-disk container
//!
//! # Wire format
//!
//! ```text
//! offset 0   : u8       version = 0x01
//! offset 1   : [u8; 12] nonce
//! offset 13  : [u8; n]  ciphertext (n = plaintext length)
//! offset 13+n: [u8; 16] auth tag
//! ```
//!
//! Total fixed overhead is 29 bytes. The associated data authenticated by
//! AES-256-GCM is exactly the one-byte version field, so a version-1
//! envelope can never be decrypted as if it were a different version even
//! if future versions reuse the same key.

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use zeroize::Zeroize;

/// Current (and only) envelope version.
pub const VERSION: u8 = 1;

/// AES-256-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-256-GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// AES-256-GCM key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Fixed per-envelope overhead: version byte + nonce + tag.
pub const OVERHEAD: usize = 1 + NONCE_LEN + TAG_LEN;

/// Minimum valid serialized length: version + nonce + empty ciphertext + tag.
const MIN_ENVELOPE_LEN: usize = OVERHEAD;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A self-contained, versioned AEAD envelope.
///
/// Wire format: `version (1 byte) || nonce (12 bytes) || ciphertext (variable)
/// || tag (16 bytes)`. The nonce is drawn fresh from a CSPRNG on every call
/// to [`encrypt`] and travels with the ciphertext; the tag authenticates
/// both the ciphertext and the version byte.
#[must_use = "an envelope must be persisted or it is lost"]
#[derive(Clone, Debug)]
pub struct Envelope {
    version: u8,
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_LEN],
}

impl Envelope {
    /// The envelope's version byte.
    #[must_use]
    pub const fn version(&self) -> u8 {
        self.version
    }

    /// Serialize to the on-disk wire format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let capacity = OVERHEAD.saturating_add(self.ciphertext.len());
        let mut out = Vec::with_capacity(capacity);
        out.push(self.version);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parse from the on-disk wire format.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EnvelopeFormat` if the input is shorter than
    /// the fixed 29-byte overhead or carries an unrecognized version byte.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return Err(CryptoError::EnvelopeFormat(format!(
                "envelope too short: {} bytes (minimum {MIN_ENVELOPE_LEN})",
                bytes.len()
            )));
        }

        let version = bytes[0];
        if version != VERSION {
            return Err(CryptoError::EnvelopeFormat(format!(
                "unsupported envelope version: {version}"
            )));
        }

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[1..1 + NONCE_LEN]);

        let ct_start = 1usize.saturating_add(NONCE_LEN);
        let ct_len = bytes
            .len()
            .checked_sub(ct_start)
            .and_then(|rem| rem.checked_sub(TAG_LEN))
            .ok_or_else(|| CryptoError::EnvelopeFormat("envelope length underflow".into()))?;
        let ct_end = ct_start.saturating_add(ct_len);
        let ciphertext = bytes[ct_start..ct_end].to_vec();

        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[ct_end..]);

        Ok(Self {
            version,
            nonce,
            ciphertext,
            tag,
        })
    }
}

// ---------------------------------------------------------------------------
// Core encryption
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` under `key` into a fresh version-1 [`Envelope`].
///
/// A new 96-bit nonce is drawn from the OS CSPRNG on every call. The
/// associated data authenticated alongside the ciphertext is exactly the
/// one-byte version field — callers must not pass additional AAD out of
/// band; the envelope is meant to be self-describing.
///
/// # Errors
///
/// Returns `CryptoError::Encryption` if `key` is not exactly 32 bytes or
/// the underlying AEAD operation fails.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<Envelope, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::Encryption(format!(
            "invalid key length: {} bytes (expected {KEY_LEN})",
            key.len()
        )));
    }

    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key)
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    let less_safe_key = aead::LessSafeKey::new(unbound);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    let Ok(tag) =
        less_safe_key.seal_in_place_separate_tag(nonce, aead::Aad::from([VERSION]), &mut in_out)
    else {
        in_out.zeroize();
        return Err(CryptoError::Encryption(
            "AES-256-GCM encryption failed".into(),
        ));
    };

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_ref());

    Ok(Envelope {
        version: VERSION,
        nonce: nonce_bytes,
        ciphertext: in_out,
        tag: tag_bytes,
    })
}

/// Decrypt and authenticate an [`Envelope`] under `key`.
///
/// Returns the plaintext as a [`SecretBuffer`] (zeroized on drop).
///
/// # Errors
///
/// Returns `CryptoError::Encryption` if `key` is not exactly 32 bytes.
/// Returns `CryptoError::Decryption` if authentication fails — tampered
/// ciphertext, tampered tag, wrong key, or an envelope whose version byte
/// does not match what was sealed. Callers MUST treat this as
/// non-recoverable for this one object; other envelopes are unaffected.
pub fn decrypt(envelope: &Envelope, key: &[u8]) -> Result<SecretBuffer, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::Encryption(format!(
            "invalid key length: {} bytes (expected {KEY_LEN})",
            key.len()
        )));
    }

    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key)
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    let less_safe_key = aead::LessSafeKey::new(unbound);

    let nonce = aead::Nonce::assume_unique_for_key(envelope.nonce);

    let mut ct_tag = Vec::with_capacity(envelope.ciphertext.len().saturating_add(TAG_LEN));
    ct_tag.extend_from_slice(&envelope.ciphertext);
    ct_tag.extend_from_slice(&envelope.tag);

    let plaintext_slice = less_safe_key
        .open_in_place(nonce, aead::Aad::from([envelope.version]), &mut ct_tag)
        .map_err(|_| CryptoError::Decryption)?;

    let result = SecretBuffer::new(plaintext_slice)
        .map_err(|e| CryptoError::SecureMemory(format!("secure buffer allocation failed: {e}")))?;
    ct_tag.zeroize();
    Ok(result)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: [u8; KEY_LEN] = [0xAA; KEY_LEN];
    const WRONG_KEY: [u8; KEY_LEN] = [0xBB; KEY_LEN];

    #[test]
    fn encrypt_produces_correct_lengths() {
        let plaintext = b"hello, SecureVault!";
        let envelope = encrypt(plaintext, &TEST_KEY).expect("encrypt should succeed");
        assert_eq!(envelope.version(), VERSION);
        assert_eq!(envelope.to_bytes().len(), plaintext.len() + OVERHEAD);
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let plaintext = b"secret vault data";
        let envelope = encrypt(plaintext, &TEST_KEY).expect("encrypt should succeed");
        let decrypted = decrypt(&envelope, &TEST_KEY).expect("decrypt should succeed");
        assert_eq!(decrypted.expose(), plaintext);
    }

    #[test]
    fn decrypt_fails_on_tampered_ciphertext() {
        let plaintext = b"test data";
        let envelope = encrypt(plaintext, &TEST_KEY).expect("encrypt should succeed");
        let mut bytes = envelope.to_bytes();
        let byte_idx = 1 + NONCE_LEN;
        bytes[byte_idx] ^= 0xFF;
        let tampered = Envelope::from_bytes(&bytes).expect("parse should succeed");
        let result = decrypt(&tampered, &TEST_KEY);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn decrypt_fails_on_tampered_tag() {
        let envelope = encrypt(b"test data", &TEST_KEY).expect("encrypt should succeed");
        let mut bytes = envelope.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let tampered = Envelope::from_bytes(&bytes).expect("parse should succeed");
        let result = decrypt(&tampered, &TEST_KEY);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn decrypt_fails_with_wrong_key() {
        let envelope = encrypt(b"test data", &TEST_KEY).expect("encrypt should succeed");
        let result = decrypt(&envelope, &WRONG_KEY);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn decrypt_fails_with_modified_nonce() {
        let envelope = encrypt(b"test data", &TEST_KEY).expect("encrypt should succeed");
        let mut bytes = envelope.to_bytes();
        bytes[1] ^= 0xFF;
        let tampered = Envelope::from_bytes(&bytes).expect("parse should succeed");
        let result = decrypt(&tampered, &TEST_KEY);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn flipping_any_byte_breaks_decryption() {
        let envelope = encrypt(b"the quick brown fox", &TEST_KEY).expect("encrypt should succeed");
        let original = envelope.to_bytes();
        for i in 0..original.len() {
            let mut mutated = original.clone();
            mutated[i] ^= 0x01;
            let parsed = Envelope::from_bytes(&mutated);
            let broke = match parsed {
                Err(_) => true,
                Ok(env) => decrypt(&env, &TEST_KEY).is_err(),
            };
            assert!(broke, "flipping byte {i} should break decryption");
        }
    }

    #[test]
    fn encrypt_rejects_wrong_key_length() {
        let result = encrypt(b"test", &[0u8; 31]);
        assert!(result.is_err());
    }

    #[test]
    fn encrypt_empty_plaintext_succeeds() {
        let envelope = encrypt(&[], &TEST_KEY).expect("encrypt empty should succeed");
        assert_eq!(envelope.to_bytes().len(), OVERHEAD);
        let decrypted = decrypt(&envelope, &TEST_KEY).expect("decrypt empty should succeed");
        assert!(decrypted.expose().is_empty());
    }

    #[test]
    fn two_encrypts_produce_different_nonces_and_ciphertexts() {
        let a = encrypt(b"same data", &TEST_KEY).expect("encrypt should succeed");
        let b = encrypt(b"same data", &TEST_KEY).expect("encrypt should succeed");
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn to_from_bytes_roundtrip() {
        let envelope = encrypt(b"bytes test", &TEST_KEY).expect("encrypt should succeed");
        let bytes = envelope.to_bytes();
        let restored = Envelope::from_bytes(&bytes).expect("from_bytes should succeed");
        assert_eq!(bytes, restored.to_bytes());
    }

    #[test]
    fn from_bytes_rejects_short_input() {
        let result = Envelope::from_bytes(&[0u8; 28]);
        assert!(result.is_err());
    }

    #[test]
    fn from_bytes_rejects_unknown_version() {
        let envelope = encrypt(b"versioned", &TEST_KEY).expect("encrypt should succeed");
        let mut bytes = envelope.to_bytes();
        bytes[0] = 0x02;
        let result = Envelope::from_bytes(&bytes);
        assert!(matches!(result, Err(CryptoError::EnvelopeFormat(_))));
    }

    #[test]
    fn decrypt_output_is_secret_buffer() {
        let envelope = encrypt(b"secret", &TEST_KEY).expect("encrypt should succeed");
        let decrypted = decrypt(&envelope, &TEST_KEY).expect("decrypt should succeed");
        let debug = format!("{decrypted:?}");
        assert_eq!(debug, "SecretBuffer(***)");
    }
}
