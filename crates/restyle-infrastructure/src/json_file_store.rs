//! Single-file JSON key-value store.
//!
//! All keys live in one JSON object on disk. Every write is a locked
//! read-modify-write of the whole file, so two processes sharing the file never
//! lose each other's keys, but there is no ordering between them.

use crate::paths::RestylePaths;
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use restyle_core::storage::KeyValueStore;
use restyle_core::{RestyleError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::task;

type Entries = BTreeMap<String, Value>;

/// A [`KeyValueStore`] persisted to a JSON file.
///
/// # Implementation Notes
///
/// - **Atomicity**: tmp file + rename per write
/// - **Isolation**: `fs2` advisory lock across the read-modify-write
/// - **Async-safe**: file I/O runs on `tokio::task::spawn_blocking`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    file: AtomicJsonFile<Entries>,
}

impl JsonFileStore {
    /// Opens (lazily) the store at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    /// Opens the store at `~/.config/restyle/store.json`.
    ///
    /// # Errors
    ///
    /// Returns `RestyleError::Config` if the config directory cannot be determined.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(RestylePaths::store_file()?))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    async fn read_all(&self) -> Result<Entries> {
        let file = self.file.clone();
        let entries = task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| RestyleError::internal(format!("Failed to spawn blocking task: {}", e)))??;
        Ok(entries.unwrap_or_default())
    }

    async fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Entries) + Send + 'static,
    {
        let file = self.file.clone();
        task::spawn_blocking(move || {
            file.update(Entries::new(), |entries| {
                f(entries);
                Ok(())
            })
        })
        .await
        .map_err(|e| RestyleError::internal(format!("Failed to spawn blocking task: {}", e)))??;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let key = key.to_string();
        tracing::debug!("[JsonFileStore] set '{}'", key);
        self.modify(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        tracing::debug!("[JsonFileStore] remove '{}'", key);
        self.modify(move |entries| {
            entries.remove(&key);
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read_all().await?.into_keys().collect())
    }
}
