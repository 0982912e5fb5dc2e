//! Product value type carried between catalog, cart, favorites and orders.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product as listed in the catalog.
///
/// Ledgers snapshot the fields they need from this value; optional attributes
/// are explicit `Option`s rather than missing keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Price>,
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u8>,
}

const fn default_in_stock() -> bool {
    true
}

impl Product {
    /// Discount to show on the product card.
    ///
    /// Uses the listed discount when present, otherwise derives it from
    /// `original_price`.
    #[must_use]
    pub fn effective_discount(&self) -> Option<u8> {
        self.discount_percent.or_else(|| {
            self.original_price
                .and_then(|original| self.price.discount_percent_from(original))
        })
    }

    /// Returns `true` if `query` appears in the name or category, ignoring case.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.category.to_lowercase().contains(&query)
    }
}
