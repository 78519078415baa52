//! Synchronized external store
//!
//! The cross-device key/value settings store is a consumed capability: an
//! eventually-consistent byte store with change notifications delivered
//! exactly once per external write. [`MemorySyncStore`] is the in-process
//! implementation used by tests and single-device deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{broadcast, Mutex};

use super::error::StoreError;

/// Maximum bytes all items may occupy together.
pub const QUOTA_BYTES: u64 = 102_400;

/// Maximum bytes a single item may occupy.
pub const QUOTA_BYTES_PER_ITEM: u64 = 8_192;

/// A change notification: one external write to one key.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub key: String,
    pub old: Option<Bytes>,
    pub new: Option<Bytes>,
}

/// The synchronized key/value store capability.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Reads an item, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Writes an item, overwriting any previous value.
    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError>;

    /// Bytes currently occupied by an item.
    async fn bytes_in_use(&self, key: &str) -> Result<u64, StoreError>;
}

/// In-memory synchronized store with a broadcast change feed.
pub struct MemorySyncStore {
    items: Mutex<HashMap<String, Bytes>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemorySyncStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            items: Mutex::new(HashMap::new()),
            changes,
        }
    }

    /// Subscribes to change notifications. Every `set` produces exactly one
    /// notification carrying the old and new values.
    pub fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

impl Default for MemorySyncStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncStore for MemorySyncStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        let bytes = (key.len() + value.len()) as u64;
        if bytes > QUOTA_BYTES_PER_ITEM {
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                bytes,
            });
        }

        let old = self
            .items
            .lock()
            .await
            .insert(key.to_string(), value.clone());

        // nobody listening is fine
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            old,
            new: Some(value),
        });

        Ok(())
    }

    async fn bytes_in_use(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self
            .items
            .lock()
            .await
            .get(key)
            .map(|value| (key.len() + value.len()) as u64)
            .unwrap_or(0))
    }
}
