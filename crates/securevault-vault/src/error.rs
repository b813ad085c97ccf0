//! Vault error types for `securevault-vault`.

use securevault_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by vault operations. This is the closed error
/// enumeration called for by the redesign flag against exceptions/
/// stringly-typed control flow: every variant here is a taxonomy entry,
/// not an ad hoc message.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Operation requires a prior `init`.
    #[error("vault is not initialized")]
    NotInitialized,

    /// `init` called on an already-initialized vault.
    #[error("vault is already initialized")]
    AlreadyInitialized,

    /// The supplied secret matched neither the real nor the decoy verifier.
    #[error("invalid credential")]
    InvalidCredential,

    /// Operation requires an unlocked session.
    #[error("vault is locked")]
    Locked,

    /// Operation is not permitted from an `UNLOCKED_DECOY` session.
    #[error("operation forbidden from the decoy identity")]
    DecoyForbidden,

    /// A data-model or request invariant was violated (e.g. decoy verifier
    /// equals the real verifier, PIN of the wrong length, metadata bound
    /// exceeded).
    #[error("constraint violated: {0}")]
    ConstraintViolated(String),

    /// Object-store miss for a requested id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Cryptographic operation failed (delegated from crypto-core). An
    /// `AEAD` tag mismatch on a single file envelope is non-fatal for the
    /// session; a mismatch on the metadata envelope at unlock time is not.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Underlying object-store I/O failure, surfaced verbatim.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller aborted a long-running operation (rotate/import/export/preview).
    #[error("operation cancelled")]
    Cancelled,
}
