//! Key-value store abstraction.
//!
//! The persistent substrate is an async key-value store holding JSON values.
//! All per-site keys are built from an [`crate::origin::OriginKey`].

use crate::error::{RestyleError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// An abstract async key-value store.
///
/// # Implementation Notes
///
/// Implementations offer no cross-process ordering guarantees; callers
/// serialize writes within one session.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: Key present
    /// - `Ok(None)`: Key absent
    /// - `Err(_)`: The store could not be read
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Removes a key. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Lists every key currently stored.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Reads and decodes a typed value.
///
/// # Errors
///
/// Propagates store errors; a value that does not decode as `T` is a
/// `RestyleError::Storage` error naming the key.
pub async fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| RestyleError::storage(format!("corrupt value at '{}': {}", key, e))),
        None => Ok(None),
    }
}

/// Encodes and writes a typed value.
pub async fn store_json<T: Serialize + Sync>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let value = serde_json::to_value(value)?;
    store.set(key, value).await
}
