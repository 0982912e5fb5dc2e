//! Cart ledger.
//!
//! The cart holds at most one entry per product. Adding a product that is
//! already present increases its quantity; driving a quantity to zero or
//! below removes the entry. Entries never hold a quantity of zero.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use furni_core::{Price, Product, ProductId};

use crate::error::{Result, StorefrontError, add_breadcrumb};
use crate::storage::{KeyValueStore, Keyed, PersistedList, Snapshot, keys};

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    #[serde(rename = "image")]
    pub image_ref: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub in_stock: bool,
    pub quantity: u32,
    pub date_added: DateTime<Utc>,
}

impl CartEntry {
    fn from_product(product: &Product, quantity: u32, now: DateTime<Utc>) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            original_price: product.original_price,
            image_ref: product.image.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
            in_stock: product.in_stock,
            quantity,
            date_added: now,
        }
    }

    /// `unit_price * quantity`, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.unit_price.checked_mul(self.quantity)
    }
}

impl Keyed for CartEntry {
    type Key = ProductId;

    fn key(&self) -> ProductId {
        self.product_id
    }
}

/// The shopper's cart, persisted under the `cart` key.
pub struct CartLedger<S> {
    entries: PersistedList<S, CartEntry>,
}

impl<S: KeyValueStore> CartLedger<S> {
    /// Create a cart ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            entries: PersistedList::new(store, keys::CART),
        }
    }

    /// Current cart contents in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if the cart cannot be loaded.
    pub async fn list_items(&self) -> Result<Vec<CartEntry>> {
        Ok(self.entries.read(|s| s.items().to_vec()).await?)
    }

    /// Look up the entry for a product.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if the cart cannot be loaded.
    pub async fn get(&self, product_id: ProductId) -> Result<Option<CartEntry>> {
        Ok(self.entries.read(|s| s.get(product_id).cloned()).await?)
    }

    /// Returns `true` if the product is in the cart.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if the cart cannot be loaded.
    pub async fn contains(&self, product_id: ProductId) -> Result<bool> {
        Ok(self.entries.read(|s| s.contains(product_id)).await?)
    }

    /// Add `quantity` units of `product`.
    ///
    /// Increments the existing entry when the product is already in the cart,
    /// otherwise appends a new entry stamped with the current time. Returns
    /// the resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::InvalidArgument` if `quantity` is zero or the
    /// resulting quantity overflows, and `StorefrontError::Storage` if the
    /// cart cannot be persisted.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&self, product: &Product, quantity: u32) -> Result<u32> {
        if quantity == 0 {
            return Err(StorefrontError::InvalidArgument(
                "quantity must be greater than zero".to_string(),
            ));
        }

        let now = Utc::now();
        let new_quantity = self
            .entries
            .update(|entries| -> Result<u32> {
                if let Some(entry) = entries.iter_mut().find(|e| e.product_id == product.id) {
                    entry.quantity = entry.quantity.checked_add(quantity).ok_or_else(|| {
                        StorefrontError::InvalidArgument("quantity is too large".to_string())
                    })?;
                    Ok(entry.quantity)
                } else {
                    entries.push(CartEntry::from_product(product, quantity, now));
                    Ok(quantity)
                }
            })
            .await?;

        debug!(quantity = new_quantity, "Added to cart");
        add_breadcrumb(
            "cart",
            "Added item",
            Some(&[("product_id", product.id.to_string().as_str())]),
        );
        Ok(new_quantity)
    }

    /// Remove the entry for a product. Removing an absent product is a no-op.
    ///
    /// Returns whether an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: ProductId) -> Result<bool> {
        if !self.contains(product_id).await? {
            return Ok(false);
        }
        let removed = self
            .entries
            .update(|entries| {
                let before = entries.len();
                entries.retain(|e| e.product_id != product_id);
                Ok::<_, StorefrontError>(entries.len() != before)
            })
            .await?;
        if removed {
            add_breadcrumb(
                "cart",
                "Removed item",
                Some(&[("product_id", product_id.to_string().as_str())]),
            );
        }
        Ok(removed)
    }

    /// Overwrite the quantity of an existing entry.
    ///
    /// A quantity of zero or below removes the entry, exactly like
    /// [`CartLedger::remove_item`].
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` if the product is not in the cart,
    /// `StorefrontError::InvalidArgument` if the quantity does not fit a `u32`,
    /// and `StorefrontError::Storage` if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, product_id: ProductId, new_quantity: i64) -> Result<()> {
        if !self.contains(product_id).await? {
            return Err(StorefrontError::NotFound(format!(
                "product {product_id} is not in the cart"
            )));
        }
        if new_quantity <= 0 {
            self.remove_item(product_id).await?;
            return Ok(());
        }
        let quantity = u32::try_from(new_quantity).map_err(|_| {
            StorefrontError::InvalidArgument(format!("quantity {new_quantity} is too large"))
        })?;

        self.entries
            .update(|entries| {
                let entry = entries
                    .iter_mut()
                    .find(|e| e.product_id == product_id)
                    .ok_or_else(|| {
                        StorefrontError::NotFound(format!("product {product_id} is not in the cart"))
                    })?;
                entry.quantity = quantity;
                Ok(())
            })
            .await
    }

    /// Take ordered units out of the cart.
    ///
    /// Each listed product loses the given quantity and its entry is dropped
    /// once nothing is left. Units added after the order was taken stay in
    /// the cart, as do products the order does not mention.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if the cart cannot be persisted.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn deduct(&self, lines: &[(ProductId, u32)]) -> Result<()> {
        self.entries
            .update(|entries| {
                for &(product_id, quantity) in lines {
                    if let Some(entry) = entries.iter_mut().find(|e| e.product_id == product_id) {
                        entry.quantity = entry.quantity.saturating_sub(quantity);
                    }
                }
                entries.retain(|e| e.quantity > 0);
                Ok(())
            })
            .await
    }

    /// Sum of `unit_price * quantity` over all entries, computed exactly.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if the cart cannot be loaded, or
    /// `StorefrontError::InvalidArgument` if the total overflows.
    pub async fn total(&self) -> Result<Price> {
        self.entries.read(total_of).await?
    }

    /// Total number of units across all entries.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if the cart cannot be loaded.
    pub async fn item_count(&self) -> Result<u32> {
        Ok(self
            .entries
            .read(|s| s.items().iter().map(|e| e.quantity).fold(0u32, u32::saturating_add))
            .await?)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if the stored cart cannot be removed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        self.entries.clear().await?;
        debug!("Cart cleared");
        Ok(())
    }

    /// Discard the in-memory copy and re-read the store on next access.
    pub async fn reload(&self) {
        self.entries.invalidate().await;
    }
}

fn total_of(snapshot: &Snapshot<CartEntry>) -> Result<Price> {
    snapshot.items().iter().try_fold(Price::ZERO, |sum, entry| {
        entry
            .line_total()
            .and_then(|line| sum.checked_add(line))
            .ok_or_else(|| StorefrontError::InvalidArgument("cart total is too large".to_string()))
    })
}
