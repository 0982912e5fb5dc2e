//! A keyed list mirrored to a single storage key.
//!
//! [`PersistedList`] is the shared machinery behind the cart, favorites and
//! order collections. Every mutation is read-entire-collection, modify,
//! write-entire-collection, performed while holding the list's lock, so two
//! concurrent updates cannot both start from the same stale copy. The
//! in-memory copy is replaced only after the store accepted the new value.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{error, warn};

use super::{KeyValueStore, StorageError};

/// An element of a [`PersistedList`] identified by a unique key.
pub trait Keyed {
    /// Key type; at most one element per key is kept.
    type Key: Copy + Eq + Hash;

    /// The element's key.
    fn key(&self) -> Self::Key;
}

/// Loaded contents of a [`PersistedList`] with a key index.
#[derive(Debug, Clone)]
pub struct Snapshot<T: Keyed> {
    items: Vec<T>,
    index: HashMap<T::Key, usize>,
}

impl<T: Keyed> Snapshot<T> {
    fn new(items: Vec<T>) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(position, item)| (item.key(), position))
            .collect();
        Self { items, index }
    }

    /// Elements in insertion order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Look up an element by key.
    #[must_use]
    pub fn get(&self, key: T::Key) -> Option<&T> {
        self.index.get(&key).and_then(|&i| self.items.get(i))
    }

    /// Returns `true` if an element with `key` is present.
    #[must_use]
    pub fn contains(&self, key: T::Key) -> bool {
        self.index.contains_key(&key)
    }

    /// Iterate over the keys present.
    pub fn keys(&self) -> impl Iterator<Item = T::Key> + '_ {
        self.index.keys().copied()
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A list of `T` stored as JSON under one key of a [`KeyValueStore`].
pub struct PersistedList<S, T: Keyed> {
    store: Arc<S>,
    key: &'static str,
    cached: Mutex<Option<Snapshot<T>>>,
}

impl<S, T> PersistedList<S, T>
where
    S: KeyValueStore,
    T: Keyed + Clone + PartialEq + Serialize + DeserializeOwned + Send,
    T::Key: Send,
{
    /// Bind a list to `key` in `store`. Nothing is read until first use.
    #[must_use]
    pub fn new(store: Arc<S>, key: &'static str) -> Self {
        Self {
            store,
            key,
            cached: Mutex::new(None),
        }
    }

    /// The storage key.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Run `f` against the current contents.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the collection has not been loaded yet and
    /// cannot be read or decoded.
    pub async fn read<R>(&self, f: impl FnOnce(&Snapshot<T>) -> R) -> Result<R, StorageError> {
        let mut cached = self.cached.lock().await;
        let snapshot = self.loaded(&mut cached).await?;
        Ok(f(snapshot))
    }

    /// Apply `f` to a working copy and persist the result.
    ///
    /// If `f` fails, or the store rejects the write, neither the stored value
    /// nor the in-memory contents change. A working copy equal to the current
    /// contents is not written.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or a `StorageError` (converted into
    /// `E`) if loading or writing fails.
    pub async fn update<R, E>(&self, f: impl FnOnce(&mut Vec<T>) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StorageError>,
    {
        let mut cached = self.cached.lock().await;
        let current = self.loaded(&mut cached).await?;
        let mut working = current.items.clone();

        let result = f(&mut working)?;
        if working == current.items {
            return Ok(result);
        }

        let text = serde_json::to_string(&working).map_err(StorageError::from)?;
        if let Err(e) = self.store.set(self.key, text).await {
            error!(key = self.key, error = %e, "Failed to persist collection");
            return Err(e.into());
        }

        *cached = Some(Snapshot::new(working));
        Ok(result)
    }

    /// Remove every element and delete the storage key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store rejects the removal; the contents
    /// are unchanged in that case.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut cached = self.cached.lock().await;
        if let Err(e) = self.store.remove(self.key).await {
            error!(key = self.key, error = %e, "Failed to clear collection");
            return Err(e);
        }
        *cached = Some(Snapshot::new(Vec::new()));
        Ok(())
    }

    /// Drop the in-memory copy so the next access re-reads the store.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn loaded<'a>(
        &self,
        cached: &'a mut Option<Snapshot<T>>,
    ) -> Result<&'a Snapshot<T>, StorageError> {
        if cached.is_none() {
            let items = self.fetch().await?;
            *cached = Some(Snapshot::new(items));
        }
        cached
            .as_ref()
            .ok_or_else(|| StorageError::Backend(format!("collection `{}` not loaded", self.key)))
    }

    async fn fetch(&self) -> Result<Vec<T>, StorageError> {
        let Some(text) = self.store.get(self.key).await? else {
            return Ok(Vec::new());
        };
        let mut items: Vec<T> = serde_json::from_str(&text)?;

        let before = items.len();
        let mut seen = std::collections::HashSet::with_capacity(before);
        items.retain(|item| seen.insert(item.key()));
        if items.len() != before {
            warn!(
                key = self.key,
                dropped = before - items.len(),
                "Dropped duplicate entries from stored collection"
            );
        }

        Ok(items)
    }
}
