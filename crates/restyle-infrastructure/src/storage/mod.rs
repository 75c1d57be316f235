//! Atomic file storage.

mod atomic_json;
mod config_storage;

pub use atomic_json::{AtomicJsonError, AtomicJsonFile};
pub use config_storage::{ConfigStorage, ConfigStorageError};
