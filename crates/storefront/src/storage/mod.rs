//! On-device key-value storage.
//!
//! Ledgers persist their collections as JSON text under fixed keys through the
//! [`KeyValueStore`] contract. Two backends are provided:
//!
//! - [`MemoryStore`] - process-local map, used by tests and embedders
//! - [`FileStore`] - one JSON file per key under a data directory, used by the CLI
//!
//! [`Namespaced`] scopes any store to a single account so two shoppers on the
//! same device never share a cart.

mod collection;
mod file;
mod memory;

pub use collection::{Keyed, PersistedList, Snapshot};
pub use file::FileStore;
pub use memory::MemoryStore;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

/// Storage keys used by the storefront.
pub mod keys {
    /// Cart ledger collection.
    pub const CART: &str = "cart";

    /// Favorites ledger collection.
    pub const FAVORITES: &str = "favorites";

    /// Order history collection.
    pub const ORDERS: &str = "orders";

    /// Registered accounts (local authentication gateway).
    pub const ACCOUNTS: &str = "accounts";

    /// Currently signed-in account (local authentication gateway).
    pub const AUTH_SESSION: &str = "auth_session";
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored text could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend did not answer within the configured bound.
    #[error("storage operation on `{key}` timed out")]
    Timeout {
        /// Key being accessed.
        key: String,
    },

    /// The key is not acceptable to the backend.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// String-keyed persistence over serialized text.
///
/// Implementations must make each call atomic: after a failed `set` the
/// previous value is still readable.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl<S: KeyValueStore> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).remove(key)
    }
}

/// A view of a store where every key is prefixed with a namespace.
///
/// Keys become `<namespace>/<key>`.
#[derive(Debug)]
pub struct Namespaced<S> {
    inner: Arc<S>,
    namespace: String,
}

impl<S> Clone for Namespaced<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            namespace: self.namespace.clone(),
        }
    }
}

impl<S: KeyValueStore> Namespaced<S> {
    /// Scope `inner` to `namespace`.
    #[must_use]
    pub fn new(inner: Arc<S>, namespace: impl Into<String>) -> Self {
        Self {
            inner,
            namespace: namespace.into(),
        }
    }

    /// The namespace prefix.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}/{key}", self.namespace)
    }
}

impl<S: KeyValueStore> KeyValueStore for Namespaced<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(&self.scoped(key)).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.inner.set(&self.scoped(key), value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(&self.scoped(key)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let base = Arc::new(MemoryStore::new());
        let alice = Namespaced::new(Arc::clone(&base), "users/alice");
        let bob = Namespaced::new(Arc::clone(&base), "users/bob");

        alice.set(keys::CART, "[1]".to_string()).await.unwrap();

        assert_eq!(alice.get(keys::CART).await.unwrap().as_deref(), Some("[1]"));
        assert!(bob.get(keys::CART).await.unwrap().is_none());
        assert_eq!(
            base.get("users/alice/cart").await.unwrap().as_deref(),
            Some("[1]")
        );
    }
}
