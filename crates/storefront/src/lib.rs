//! Furni storefront library.
//!
//! Shopping state for the Furni furniture store: a cart, a favorites list and
//! an order history for each signed-in account, persisted to an on-device
//! key-value store, plus the time-driven order lifecycle.
//!
//! # Modules
//!
//! - [`storage`] - Key-value store contract, memory and file backends
//! - [`cart`] / [`favorites`] - Ledgers over one persisted collection each
//! - [`orders`] - Order book, lifecycle simulator and background poller
//! - [`services::auth`] - Authentication gateway contract and local implementation
//! - [`session`] - Per-account context handed out after sign-in
//! - [`catalog`] - Built-in product catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod favorites;
pub mod orders;
pub mod services;
pub mod session;
pub mod storage;

pub use cart::{CartEntry, CartLedger};
pub use catalog::{Catalog, CatalogError};
pub use config::{ConfigError, StorefrontConfig};
pub use error::{Result, StorefrontError};
pub use favorites::{FavoriteEntry, FavoritesLedger};
pub use orders::{LineItem, Order, OrderBook, OrderPoller, PollReport};
pub use services::auth::{AuthError, AuthGateway, AuthUser, LocalAuthGateway};
pub use session::{StoreSession, Storefront};
pub use storage::{FileStore, KeyValueStore, MemoryStore, Namespaced, StorageError};
