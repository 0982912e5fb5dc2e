//! Favorites ledger.
//!
//! Favorites keep a snapshot of the product as it looked when it was marked,
//! so the favorites screen renders without a catalog lookup. There is at most
//! one entry per product; an entry is replaced only by removing and
//! re-adding it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use furni_core::{Price, Product, ProductId};

use crate::cart::CartLedger;
use crate::error::{Result, StorefrontError, add_breadcrumb};
use crate::storage::{KeyValueStore, Keyed, PersistedList, keys};

/// A marked product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    #[serde(rename = "image")]
    pub image_ref: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(rename = "reviews", default)]
    pub review_count: u32,
    #[serde(rename = "discount", default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u8>,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub in_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_count: Option<u32>,
    pub date_added: DateTime<Utc>,
}

impl FavoriteEntry {
    fn from_product(product: &Product, now: DateTime<Utc>) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            original_price: product.original_price,
            image_ref: product.image.clone(),
            rating: product.rating.unwrap_or_default(),
            review_count: product.review_count.unwrap_or_default(),
            discount_percent: product.effective_discount(),
            category: product.category.clone(),
            description: product.description.clone(),
            in_stock: product.in_stock,
            stock_count: product.stock_count,
            date_added: now,
        }
    }

    /// Rebuild the product value from the snapshot.
    #[must_use]
    pub fn to_product(&self) -> Product {
        Product {
            id: self.product_id,
            name: self.name.clone(),
            price: self.price,
            original_price: self.original_price,
            image: self.image_ref.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            in_stock: self.in_stock,
            stock_count: self.stock_count,
            rating: Some(self.rating),
            review_count: Some(self.review_count),
            discount_percent: self.discount_percent,
        }
    }
}

impl Keyed for FavoriteEntry {
    type Key = ProductId;

    fn key(&self) -> ProductId {
        self.product_id
    }
}

/// The shopper's favorites, persisted under the `favorites` key.
pub struct FavoritesLedger<S> {
    entries: PersistedList<S, FavoriteEntry>,
}

impl<S: KeyValueStore> FavoritesLedger<S> {
    /// Create a favorites ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            entries: PersistedList::new(store, keys::FAVORITES),
        }
    }

    /// All favorites in the order they were marked.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if favorites cannot be loaded.
    pub async fn list(&self) -> Result<Vec<FavoriteEntry>> {
        Ok(self.entries.read(|s| s.items().to_vec()).await?)
    }

    /// IDs of all favorites, for membership checks while rendering a list.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if favorites cannot be loaded.
    pub async fn list_ids(&self) -> Result<HashSet<ProductId>> {
        Ok(self.entries.read(|s| s.keys().collect()).await?)
    }

    /// Look up a favorite by product.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if favorites cannot be loaded.
    pub async fn get(&self, product_id: ProductId) -> Result<Option<FavoriteEntry>> {
        Ok(self.entries.read(|s| s.get(product_id).cloned()).await?)
    }

    /// Returns `true` if the product is a favorite.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if favorites cannot be loaded.
    pub async fn is_favorite(&self, product_id: ProductId) -> Result<bool> {
        Ok(self.entries.read(|s| s.contains(product_id)).await?)
    }

    /// Mark a product. Returns `false` if it was already a favorite.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if favorites cannot be persisted.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &Product) -> Result<bool> {
        if self.is_favorite(product.id).await? {
            return Ok(false);
        }
        let now = Utc::now();
        self.entries
            .update(|entries| {
                if entries.iter().any(|e| e.product_id == product.id) {
                    return Ok(false);
                }
                entries.push(FavoriteEntry::from_product(product, now));
                Ok(true)
            })
            .await
    }

    /// Unmark a product. Returns `false` if it was not a favorite.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if favorites cannot be persisted.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: ProductId) -> Result<bool> {
        if !self.is_favorite(product_id).await? {
            return Ok(false);
        }
        self.entries
            .update(|entries| {
                let before = entries.len();
                entries.retain(|e| e.product_id != product_id);
                Ok(entries.len() != before)
            })
            .await
    }

    /// Flip membership of `product`. Returns `true` if it is now a favorite.
    ///
    /// Membership is decided from the stored collection under the ledger
    /// lock, never from a caller-held flag, so two rapid toggles always
    /// cancel out.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if favorites cannot be persisted.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn toggle(&self, product: &Product) -> Result<bool> {
        let now = Utc::now();
        let now_favorite = self
            .entries
            .update(|entries| -> Result<bool> {
                let before = entries.len();
                entries.retain(|e| e.product_id != product.id);
                if entries.len() == before {
                    entries.push(FavoriteEntry::from_product(product, now));
                    Ok(true)
                } else {
                    Ok(false)
                }
            })
            .await?;

        debug!(now_favorite, "Toggled favorite");
        add_breadcrumb(
            "favorites",
            if now_favorite { "Marked favorite" } else { "Unmarked favorite" },
            Some(&[("product_id", product.id.to_string().as_str())]),
        );
        Ok(now_favorite)
    }

    /// Add a favorite's snapshot to `cart` with quantity 1.
    ///
    /// The product stays a favorite. Returns the resulting cart quantity.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` if the product is not a favorite,
    /// or any error from [`CartLedger::add_item`].
    pub async fn move_to_cart(&self, product_id: ProductId, cart: &CartLedger<S>) -> Result<u32> {
        let entry = self.get(product_id).await?.ok_or_else(|| {
            StorefrontError::NotFound(format!("product {product_id} is not a favorite"))
        })?;
        cart.add_item(&entry.to_product(), 1).await
    }

    /// Remove every favorite.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if the stored favorites cannot be removed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        Ok(self.entries.clear().await?)
    }

    /// Discard the in-memory copy and re-read the store on next access.
    pub async fn reload(&self) {
        self.entries.invalidate().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn lamp(id: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: "Modern Floor Lamp".to_string(),
            price: Price::from_cents(19_900),
            original_price: Some(Price::from_cents(27_900)),
            image: "lamp.jpg".to_string(),
            category: "Lamps".to_string(),
            description: "Arched floor lamp".to_string(),
            in_stock: true,
            stock_count: Some(4),
            rating: Some(4.6),
            review_count: Some(57),
            discount_percent: None,
        }
    }

    fn ledger() -> (Arc<MemoryStore>, FavoritesLedger<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), FavoritesLedger::new(store))
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (_, favorites) = ledger();
        assert!(favorites.add(&lamp(13)).await.unwrap());
        assert!(!favorites.add(&lamp(13)).await.unwrap());
        assert_eq!(favorites.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_fields() {
        let (_, favorites) = ledger();
        favorites.add(&lamp(13)).await.unwrap();

        let entry = favorites.get(ProductId::new(13)).await.unwrap().unwrap();
        assert_eq!(entry.review_count, 57);
        assert_eq!(entry.discount_percent, Some(28));
        assert_eq!(entry.stock_count, Some(4));
        assert_eq!(entry.to_product().price, Price::from_cents(19_900));
    }

    #[tokio::test]
    async fn test_toggle_is_its_own_inverse() {
        let (_, favorites) = ledger();
        let product = lamp(1);

        assert!(favorites.toggle(&product).await.unwrap());
        assert!(favorites.is_favorite(product.id).await.unwrap());
        assert!(!favorites.toggle(&product).await.unwrap());
        assert!(!favorites.is_favorite(product.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_ids_and_order() {
        let (_, favorites) = ledger();
        for id in [5, 2, 9] {
            favorites.add(&lamp(id)).await.unwrap();
        }
        favorites.remove(ProductId::new(2)).await.unwrap();

        let ids = favorites.list_ids().await.unwrap();
        assert_eq!(ids, HashSet::from([ProductId::new(5), ProductId::new(9)]));

        let order: Vec<i32> = favorites
            .list()
            .await
            .unwrap()
            .iter()
            .map(|f| f.product_id.as_i32())
            .collect();
        assert_eq!(order, vec![5, 9]);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let (_, favorites) = ledger();
        assert!(!favorites.remove(ProductId::new(3)).await.unwrap());
    }

    #[tokio::test]
    async fn test_move_to_cart() {
        let (store, favorites) = ledger();
        let cart = CartLedger::new(Arc::clone(&store));
        favorites.add(&lamp(13)).await.unwrap();

        assert_eq!(favorites.move_to_cart(ProductId::new(13), &cart).await.unwrap(), 1);
        assert_eq!(favorites.move_to_cart(ProductId::new(13), &cart).await.unwrap(), 2);
        assert!(favorites.is_favorite(ProductId::new(13)).await.unwrap());

        let missing = favorites.move_to_cart(ProductId::new(1), &cart).await;
        assert!(matches!(missing, Err(StorefrontError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_failure_keeps_membership() {
        let (store, favorites) = ledger();
        favorites.add(&lamp(1)).await.unwrap();

        store.fail_writes(true);
        assert!(favorites.toggle(&lamp(1)).await.is_err());
        assert!(favorites.is_favorite(ProductId::new(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear() {
        let (store, favorites) = ledger();
        favorites.add(&lamp(1)).await.unwrap();
        favorites.clear().await.unwrap();
        assert!(favorites.list().await.unwrap().is_empty());
        assert!(store.get(keys::FAVORITES).await.unwrap().is_none());
    }
}
