//! Order history and lifecycle.
//!
//! Orders are created at checkout and never deleted; they only move forward
//! through the lifecycle driven by [`simulator`]. The [`OrderBook`] applies
//! due transitions whenever orders are read, and [`OrderPoller`] applies them
//! periodically in the background.

mod demo;
mod poller;
pub mod simulator;

pub use poller::{OrderPoller, PollReport};

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use furni_core::{OrderId, OrderStatus, Price, ProductId};

use crate::cart::CartEntry;
use crate::error::{Result, StorefrontError};
use crate::storage::{KeyValueStore, Keyed, PersistedList, keys};

/// One product line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Price,
    #[serde(rename = "image")]
    pub image_ref: String,
    pub quantity: u32,
}

impl LineItem {
    /// `unit_price * quantity`, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.unit_price.checked_mul(self.quantity)
    }
}

impl From<&CartEntry> for LineItem {
    fn from(entry: &CartEntry) -> Self {
        Self {
            product_id: entry.product_id,
            name: entry.name.clone(),
            unit_price: entry.unit_price,
            image_ref: entry.image_ref.clone(),
            quantity: entry.quantity,
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(rename = "items")]
    pub line_items: Vec<LineItem>,
    pub total_amount: Price,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(rename = "canCancel")]
    pub cancellable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.line_items
            .iter()
            .map(|l| l.quantity)
            .fold(0, u32::saturating_add)
    }
}

impl Keyed for Order {
    type Key = OrderId;

    fn key(&self) -> OrderId {
        self.id
    }
}

/// The shopper's orders, persisted under the `orders` key.
pub struct OrderBook<S> {
    orders: PersistedList<S, Order>,
}

impl<S: KeyValueStore> OrderBook<S> {
    /// Create an order book over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            orders: PersistedList::new(store, keys::ORDERS),
        }
    }

    /// Apply every due transition at `now`. Returns how many orders changed.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if orders cannot be loaded or saved.
    #[instrument(skip(self))]
    pub async fn recompute_all(&self, now: DateTime<Utc>) -> Result<usize> {
        let changed = self
            .orders
            .update(|orders| -> Result<usize> {
                let mut changed = 0;
                for order in orders.iter_mut() {
                    let next = simulator::recompute(order, now);
                    if next != *order {
                        if next.status != order.status {
                            info!(
                                order_id = %order.id,
                                from = %order.status,
                                to = %next.status,
                                "Order status changed"
                            );
                        }
                        *order = next;
                        changed += 1;
                    }
                }
                Ok(changed)
            })
            .await?;
        Ok(changed)
    }

    /// All orders as of `now`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if orders cannot be loaded or saved.
    pub async fn list(&self, now: DateTime<Utc>) -> Result<Vec<Order>> {
        self.recompute_all(now).await?;
        let mut orders = self.orders.read(|s| s.items().to_vec()).await?;
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(orders)
    }

    /// One order as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if orders cannot be loaded or saved.
    pub async fn get(&self, order_id: OrderId, now: DateTime<Utc>) -> Result<Option<Order>> {
        self.recompute_all(now).await?;
        Ok(self.orders.read(|s| s.get(order_id).cloned()).await?)
    }

    /// Create a processing order from `line_items`, placed at `now`.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::InvalidArgument` if there are no line items
    /// or a line has a zero quantity, and `StorefrontError::Storage` if the
    /// order cannot be saved.
    #[instrument(skip(self, line_items), fields(lines = line_items.len()))]
    pub async fn place(&self, line_items: Vec<LineItem>, now: DateTime<Utc>) -> Result<Order> {
        if line_items.is_empty() {
            return Err(StorefrontError::InvalidArgument(
                "an order needs at least one item".to_string(),
            ));
        }
        if line_items.iter().any(|l| l.quantity == 0) {
            return Err(StorefrontError::InvalidArgument(
                "order quantities must be greater than zero".to_string(),
            ));
        }
        let total_amount = line_items.iter().try_fold(Price::ZERO, |sum, line| {
            line.line_total()
                .and_then(|l| sum.checked_add(l))
                .ok_or_else(|| StorefrontError::InvalidArgument("order total is too large".to_string()))
        })?;

        let order = self
            .orders
            .update(|orders| -> Result<Order> {
                let id = orders
                    .iter()
                    .map(|o| o.id.as_i32())
                    .max()
                    .map_or(1, |max| max.saturating_add(1));
                let order = Order {
                    id: OrderId::new(id),
                    order_number: format!("ORD-{}-{:03}", now.year(), orders.len() + 1),
                    line_items,
                    total_amount,
                    status: OrderStatus::Processing,
                    order_date: now,
                    estimated_delivery: None,
                    cancellable: true,
                    tracking_number: None,
                };
                orders.push(order.clone());
                Ok(order)
            })
            .await?;

        info!(order_id = %order.id, order_number = %order.order_number, total = %order.total_amount, "Order placed");
        Ok(order)
    }

    /// Cancel an order at `now`.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` for an unknown order,
    /// `StorefrontError::PolicyViolation` if it is past the cancellation
    /// window or no longer processing, and `StorefrontError::Storage` if the
    /// change cannot be saved.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId, now: DateTime<Utc>) -> Result<Order> {
        let cancelled = self
            .orders
            .update(|orders| -> Result<Order> {
                let order = orders
                    .iter_mut()
                    .find(|o| o.id == order_id)
                    .ok_or_else(|| StorefrontError::NotFound(format!("order {order_id}")))?;
                let cancelled = simulator::cancel(order, now)?;
                *order = cancelled.clone();
                Ok(cancelled)
            })
            .await?;

        info!(order_number = %cancelled.order_number, "Order cancelled");
        Ok(cancelled)
    }

    /// Seed the demo order history if no orders exist yet.
    ///
    /// Returns `true` if orders were added.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Storage` if orders cannot be loaded or saved.
    pub async fn seed_demo_orders(&self, now: DateTime<Utc>) -> Result<bool> {
        self.orders
            .update(|orders| -> Result<bool> {
                if !orders.is_empty() {
                    return Ok(false);
                }
                orders.extend(demo::demo_orders(now));
                Ok(true)
            })
            .await
    }

    /// Discard the in-memory copy and re-read the store on next access.
    pub async fn reload(&self) {
        self.orders.invalidate().await;
    }
}
