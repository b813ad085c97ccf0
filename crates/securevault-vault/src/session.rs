//! Session state held by an unlocked [`crate::manager::VaultManager`].
//!
//! A `Session` is an explicit value, not a singleton: spec §5 requires
//! every operation to be expressible as `(state, op, args) -> (state',
//! result)`, which means the unlocked data key and metadata index must be
//! ordinary owned data rather than ambient globals.

use crate::metadata::MetadataIndex;
use crate::registry::Identity as RegistryIdentity;
use securevault_crypto_core::SecretBytes;
use zeroize::Zeroize;

/// Which identity unlocked the current session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Identity {
    Real,
    Decoy,
}

impl From<RegistryIdentity> for Identity {
    fn from(id: RegistryIdentity) -> Self {
        match id {
            RegistryIdentity::Real => Self::Real,
            RegistryIdentity::Decoy => Self::Decoy,
        }
    }
}

impl Identity {
    /// The metadata-envelope logical name for this identity.
    #[must_use]
    pub fn metadata_object_name(self) -> &'static str {
        match self {
            Self::Real => "meta/real",
            Self::Decoy => "meta/decoy",
        }
    }
}

/// The live state of an unlocked vault: the derived data key and the
/// in-memory metadata index for whichever identity unlocked it.
pub struct Session {
    pub(crate) data_key: SecretBytes<32>,
    pub(crate) identity: Identity,
    pub(crate) metadata_index: MetadataIndex,
}

impl Session {
    pub(crate) fn new(data_key: SecretBytes<32>, identity: Identity, metadata_index: MetadataIndex) -> Self {
        Self {
            data_key,
            identity,
            metadata_index,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        self.identity
    }
}

/// A caller-held handle to a decrypted preview buffer. Zeroizes its
/// contents on drop, following the same zeroize-on-drop discipline as
/// [`securevault_crypto_core::memory::SecretBuffer`] — a preview is as
/// sensitive as the plaintext it exposes and must not outlive its need.
pub struct PreviewHandle {
    bytes: Vec<u8>,
}

impl PreviewHandle {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Borrow the decrypted preview bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PreviewHandle({} bytes, ***)", self.bytes.len())
    }
}
