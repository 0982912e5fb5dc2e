//! File-backed key-value store.
//!
//! Each key maps to `<root>/<key>.json`. A key may contain `/`-separated
//! segments, which become subdirectories. Writes go to a temporary sibling
//! file and are renamed into place, so a failed write never leaves a
//! half-written value behind.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::{KeyValueStore, StorageError};

/// Default bound on a single storage call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// [`KeyValueStore`] persisting one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    timeout: Duration,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the bound applied to every storage call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid_segment = |segment: &str| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };
        if !key.split('/').all(valid_segment) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    async fn bounded<T>(
        &self,
        key: &str,
        op: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| StorageError::Timeout {
                key: key.to_string(),
            })?
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        self.bounded(key, async {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => Ok(Some(text)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        self.bounded(key, async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let tmp = path.with_extension("json.tmp");
            tokio::fs::write(&tmp, value.as_bytes()).await?;
            tokio::fs::rename(&tmp, &path).await?;
            debug!(path = %path.display(), bytes = value.len(), "Stored value");
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        self.bounded(key, async {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.get("favorites").await.unwrap().is_none());
        store.set("favorites", "[]".to_string()).await.unwrap();
        assert_eq!(store.get("favorites").await.unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("favorites.json").exists());

        store.remove("favorites").await.unwrap();
        store.remove("favorites").await.unwrap();
        assert!(store.get("favorites").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nested_keys_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.set("users/abc-123/cart", "[]".to_string()).await.unwrap();
        assert!(store.root().join("users/abc-123/cart.json").exists());
    }

    #[tokio::test]
    async fn test_stalled_call_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).with_timeout(Duration::from_millis(20));

        let stalled = std::future::pending::<Result<(), StorageError>>();
        let result = store.bounded("users/abc-123/cart", stalled).await;
        assert!(matches!(
            result,
            Err(StorageError::Timeout { ref key }) if key == "users/abc-123/cart"
        ));

        // Calls that finish in time are unaffected.
        store.set("cart", "[]".to_string()).await.unwrap();
        assert_eq!(store.get("cart").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        for key in ["../escape", "a//b", "", "cart.json", "/abs"] {
            assert!(
                matches!(store.get(key).await, Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
