//! `securevault-vault` — object store, credential registry, and the vault
//! state machine orchestrating them.
//!
//! This crate consumes `securevault-crypto-core`'s pure primitives and adds
//! everything that touches disk: atomic object storage, the plaintext
//! credential registry, the metadata index, and the `VaultManager` state
//! machine that serializes operations against a single session.

pub mod config;
pub mod error;
pub mod ids;
pub mod manager;
pub mod metadata;
pub mod object_store;
pub mod registry;
pub mod session;

pub use config::VaultConfig;
pub use error::VaultError;
pub use ids::VaultId;
pub use manager::{RotationProgress, VaultManager, VaultState};
pub use metadata::VaultItem;
pub use object_store::{FsObjectStore, MemObjectStore, ObjectStore};
pub use registry::LockType;
pub use session::{Identity, PreviewHandle};
