//! In-memory key-value store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use super::{KeyValueStore, StorageError};

/// Process-local [`KeyValueStore`] backed by a `HashMap`.
///
/// Writes can be made to fail on demand with [`MemoryStore::fail_writes`],
/// which simulates a full or unavailable device store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` and `remove` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn check_writable(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("write to `{key}` rejected")));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}
