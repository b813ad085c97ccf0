//! 128-bit opaque vault item identifiers.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 128-bit opaque identifier for a [`crate::metadata::VaultItem`].
///
/// Displayed and persisted as a 32-character lowercase hex string, per
/// spec §6's `file/<id>` object-store naming.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VaultId([u8; 16]);

impl VaultId {
    /// Generate a fresh random id from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// The object-store logical name `file/<id>` for this id.
    #[must_use]
    pub fn object_name(&self) -> String {
        format!("file/{self}")
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultId({self})")
    }
}

/// Error returned when parsing a malformed id string.
#[derive(Debug, thiserror::Error)]
#[error("invalid vault id: {0}")]
pub struct ParseVaultIdError(String);

impl FromStr for VaultId {
    type Err = ParseVaultIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseVaultIdError(s.to_string()));
        }
        let mut bytes = [0u8; 16];
        for (i, chunk) in s.as_bytes().chunks_exact(2).enumerate() {
            let hex = std::str::from_utf8(chunk).map_err(|_| ParseVaultIdError(s.to_string()))?;
            bytes[i] =
                u8::from_str_radix(hex, 16).map_err(|_| ParseVaultIdError(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for VaultId {
    type Error = ParseVaultIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VaultId> for String {
    fn from(id: VaultId) -> Self {
        id.to_string()
    }
}
