#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for Argon2id-backed key/verifier derivation.

use proptest::prelude::*;
use securevault_crypto_core::kdf::{derive_key, derive_verifier, Argon2idParams};

/// Small params for fast property tests.
const PROP_PARAMS: Argon2idParams = Argon2idParams {
    m_cost: 32,
    t_cost: 1,
    p_cost: 1,
};

proptest! {
    /// Derived key and verifier are always exactly 32 bytes.
    #[test]
    fn derive_always_32_bytes(
        secret in proptest::collection::vec(any::<u8>(), 1..128),
        salt in proptest::collection::vec(any::<u8>(), 16..64),
    ) {
        let key = derive_key(&secret, &salt, &PROP_PARAMS)
            .expect("derive_key should succeed with valid inputs");
        prop_assert_eq!(key.expose().len(), 32);

        let verifier = derive_verifier(&secret, &salt, &PROP_PARAMS)
            .expect("derive_verifier should succeed with valid inputs");
        prop_assert_eq!(verifier.len(), 32);
    }

    /// Property 2 (partial, spec §8): key and verifier are never equal
    /// for any (secret, salt) pair.
    #[test]
    fn key_and_verifier_never_equal(
        secret in proptest::collection::vec(any::<u8>(), 1..64),
        salt in proptest::collection::vec(any::<u8>(), 16..32),
    ) {
        let key = derive_key(&secret, &salt, &PROP_PARAMS).expect("derive_key should succeed");
        let verifier = derive_verifier(&secret, &salt, &PROP_PARAMS)
            .expect("derive_verifier should succeed");
        prop_assert_ne!(key.expose().as_slice(), verifier.as_slice());
    }

    /// Different secrets under the same salt never collide on key or verifier.
    #[test]
    fn different_secrets_different_outputs(
        secret_a in proptest::collection::vec(any::<u8>(), 1..64),
        secret_b in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        prop_assume!(secret_a != secret_b);
        let salt = b"proptest_salt_16b";

        let key_a = derive_key(&secret_a, salt, &PROP_PARAMS).expect("derive_key should succeed");
        let key_b = derive_key(&secret_b, salt, &PROP_PARAMS).expect("derive_key should succeed");
        prop_assert_ne!(key_a.expose(), key_b.expose());

        let ver_a = derive_verifier(&secret_a, salt, &PROP_PARAMS)
            .expect("derive_verifier should succeed");
        let ver_b = derive_verifier(&secret_b, salt, &PROP_PARAMS)
            .expect("derive_verifier should succeed");
        prop_assert_ne!(ver_a, ver_b);
    }
}
