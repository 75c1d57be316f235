//! Storage substrate for the Restyle engine.
//!
//! # Module Structure
//!
//! - `paths`: platform directories (`~/.config/restyle/`)
//! - `storage`: atomic JSON files and TOML config storage
//! - `memory_store` / `json_file_store`: [`KeyValueStore`] implementations
//! - `credential_store`: [`CredentialStore`] implementations
//!
//! [`KeyValueStore`]: restyle_core::storage::KeyValueStore
//! [`CredentialStore`]: restyle_core::secret::CredentialStore

pub mod credential_store;
pub mod json_file_store;
pub mod memory_store;
pub mod paths;
pub mod storage;

pub use crate::credential_store::{FileCredentialStore, MemoryCredentialStore};
pub use crate::json_file_store::JsonFileStore;
pub use crate::memory_store::MemoryStore;
pub use crate::paths::{PathError, RestylePaths};
