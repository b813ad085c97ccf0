//! Vault Item and Metadata Index (spec §6).
//!
//! The index is a newest-first sequence of [`VaultItem`], serialized as
//! JSON plaintext before being sealed into an AEAD envelope by the caller
//! (the Vault Manager) under a fixed logical name per identity.

use crate::error::VaultError;
use crate::ids::VaultId;
use serde::{Deserialize, Serialize};

/// One entry in a Metadata Index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultItem {
    pub id: VaultId,
    /// UTF-8 string; may be attacker-chosen, never used as a filesystem path.
    pub original_name: String,
    /// Advisory label, not enforced against the actual payload bytes.
    pub mime_type: String,
    pub size: u64,
    /// Wall-clock timestamp (seconds since epoch), informational only.
    pub imported_at: u64,
}

/// An identity's ordered (newest-first) collection of [`VaultItem`]s.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetadataIndex {
    items: Vec<VaultItem>,
}

impl MetadataIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize plaintext JSON bytes, rejecting anything over `bound_bytes`
    /// to avoid unbounded allocation on a corrupted or hostile envelope.
    ///
    /// # Errors
    /// Returns `VaultError::ConstraintViolated` if `plaintext` exceeds the
    /// bound or fails to parse as a `MetadataIndex`.
    pub fn decode(plaintext: &[u8], bound_bytes: usize) -> Result<Self, VaultError> {
        if plaintext.len() > bound_bytes {
            return Err(VaultError::ConstraintViolated(format!(
                "metadata envelope of {} bytes exceeds bound of {bound_bytes}",
                plaintext.len()
            )));
        }
        serde_json::from_slice(plaintext)
            .map_err(|e| VaultError::ConstraintViolated(format!("metadata decode: {e}")))
    }

    /// Serialize to canonical plaintext JSON, ready to be sealed.
    ///
    /// # Errors
    /// Returns `VaultError::ConstraintViolated` if serialization fails
    /// (unreachable for this type in practice, but kept fallible for
    /// symmetry with `decode`).
    pub fn encode(&self) -> Result<Vec<u8>, VaultError> {
        serde_json::to_vec(self)
            .map_err(|e| VaultError::ConstraintViolated(format!("metadata encode: {e}")))
    }

    /// Insert `item` at the front, preserving newest-first order.
    pub fn push_front(&mut self, item: VaultItem) {
        self.items.insert(0, item);
    }

    /// Remove the item with the given id, if present, returning it.
    pub fn remove(&mut self, id: VaultId) -> Option<VaultItem> {
        let idx = self.items.iter().position(|it| it.id == id)?;
        Some(self.items.remove(idx))
    }

    #[must_use]
    pub fn get(&self, id: VaultId) -> Option<&VaultItem> {
        self.items.iter().find(|it| it.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: VaultId) -> bool {
        self.items.iter().any(|it| it.id == id)
    }

    /// Items in newest-first order, as persisted.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &VaultItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All ids currently present, in index order.
    #[must_use]
    pub fn ids(&self) -> Vec<VaultId> {
        self.items.iter().map(|it| it.id).collect()
    }
}
