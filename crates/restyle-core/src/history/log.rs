//! Capped per-origin chat history.

use super::model::ChatRecord;
use crate::error::Result;
use crate::origin::OriginKey;
use crate::storage::{KeyValueStore, load_json, store_json};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default number of records kept per origin.
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// Append-only record of interaction turns, capped per origin.
///
/// [`load`](Self::load) degrades to an empty history when the store fails or
/// holds a value that does not decode; history is optional data. Writes never
/// start from a degraded read, so a failed read cannot erase the stored log.
pub struct HistoryLog {
    store: Arc<dyn KeyValueStore>,
    cap: usize,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl HistoryLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_cap(store, DEFAULT_HISTORY_CAP)
    }

    pub fn with_cap(store: Arc<dyn KeyValueStore>, cap: usize) -> Self {
        Self {
            store,
            cap: cap.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Appends `record`, evicting the oldest entries beyond the cap.
    ///
    /// # Returns
    ///
    /// The number of records stored for the origin afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RestyleError::Storage` when the stored log cannot be read or
    /// decoded, or when the write fails. The stored log is left untouched.
    pub async fn append(&self, origin: &OriginKey, record: ChatRecord) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut records = load_json::<Vec<ChatRecord>>(self.store.as_ref(), &origin.history_key())
            .await?
            .unwrap_or_default();
        records.push(record);
        if records.len() > self.cap {
            let overflow = records.len() - self.cap;
            records.drain(..overflow);
            tracing::debug!("[History] Evicted {} oldest records for {}", overflow, origin);
        }
        store_json(self.store.as_ref(), &origin.history_key(), &records).await?;
        Ok(records.len())
    }

    /// Returns the origin's records, oldest first.
    pub async fn load(&self, origin: &OriginKey) -> Vec<ChatRecord> {
        match load_json::<Vec<ChatRecord>>(self.store.as_ref(), &origin.history_key()).await {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("[History] Failed to load history for {}: {}", origin, e);
                Vec::new()
            }
        }
    }

    /// Empties the origin's history.
    pub async fn clear(&self, origin: &OriginKey) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(&origin.history_key()).await?;
        tracing::info!("[History] Cleared history for {}", origin);
        Ok(())
    }
}
