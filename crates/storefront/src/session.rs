//! Per-account shopping context.
//!
//! A [`StoreSession`] gives access to the cart, favorites and orders of one
//! signed-in account, all scoped to `users/<account id>` in the shared store.
//! Sessions are created by [`Storefront::open_session`] and stop working as
//! soon as the account signs out. Every session of an account shares one set
//! of ledgers, so their mutations are serialized against each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use furni_core::{AccountId, OrderId, Product, ProductId};

use crate::catalog::Catalog;
use crate::cart::CartLedger;
use crate::error::{Result, StorefrontError, add_breadcrumb, report};
use crate::favorites::FavoritesLedger;
use crate::orders::{LineItem, Order, OrderBook};
use crate::services::auth::{AuthGateway, AuthUser};
use crate::storage::{KeyValueStore, Namespaced};

/// The store as seen by one account.
pub type UserStore<S> = Namespaced<S>;

/// The ledgers of one account, shared by all of its sessions.
struct AccountLedgers<S> {
    cart: CartLedger<UserStore<S>>,
    favorites: FavoritesLedger<UserStore<S>>,
    orders: Arc<OrderBook<UserStore<S>>>,
    checkout: tokio::sync::Mutex<()>,
}

impl<S: KeyValueStore> AccountLedgers<S> {
    fn new(store: &Arc<S>, account_id: AccountId) -> Self {
        let scoped = Arc::new(Namespaced::new(Arc::clone(store), format!("users/{account_id}")));
        debug!(namespace = scoped.namespace(), "Opened account ledgers");
        Self {
            cart: CartLedger::new(Arc::clone(&scoped)),
            favorites: FavoritesLedger::new(Arc::clone(&scoped)),
            orders: Arc::new(OrderBook::new(scoped)),
            checkout: tokio::sync::Mutex::new(()),
        }
    }

    /// Drop cached contents so the next access sees what is in the store.
    async fn reload(&self) {
        self.cart.reload().await;
        self.favorites.reload().await;
        self.orders.reload().await;
    }
}

/// Cart, favorites and orders of a signed-in account.
pub struct StoreSession<S> {
    user: AuthUser,
    presence: watch::Receiver<Option<AuthUser>>,
    catalog: Catalog,
    ledgers: Arc<AccountLedgers<S>>,
}

impl<S: KeyValueStore> StoreSession<S> {

    /// The account this session belongs to.
    #[must_use]
    pub const fn user(&self) -> &AuthUser {
        &self.user
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns `true` while the session's account is still signed in.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.presence
            .borrow()
            .as_ref()
            .is_some_and(|current| current.id == self.user.id)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(StorefrontError::Unauthenticated)
        }
    }

    /// The cart ledger.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Unauthenticated` after sign-out.
    pub fn cart(&self) -> Result<&CartLedger<UserStore<S>>> {
        self.ensure_active()?;
        Ok(&self.ledgers.cart)
    }

    /// The favorites ledger.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Unauthenticated` after sign-out.
    pub fn favorites(&self) -> Result<&FavoritesLedger<UserStore<S>>> {
        self.ensure_active()?;
        Ok(&self.ledgers.favorites)
    }

    /// The order book, shareable with an [`OrderPoller`](crate::orders::OrderPoller).
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Unauthenticated` after sign-out.
    pub fn orders(&self) -> Result<&Arc<OrderBook<UserStore<S>>>> {
        self.ensure_active()?;
        Ok(&self.ledgers.orders)
    }

    /// Look up a catalog product.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` if the catalog has no such product.
    pub fn product(&self, product_id: ProductId) -> Result<&Product> {
        self.catalog
            .get(product_id)
            .ok_or_else(|| StorefrontError::NotFound(format!("product {product_id}")))
    }

    /// Add a catalog product to the cart. Returns the resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` for an unknown product, or any error
    /// from [`CartLedger::add_item`].
    pub async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<u32> {
        let product = self.product(product_id)?;
        self.cart()?.add_item(product, quantity).await
    }

    /// Flip a catalog product's favorite status. Returns `true` if it is now a
    /// favorite.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` for an unknown product, or any error
    /// from [`FavoritesLedger::toggle`].
    pub async fn toggle_favorite(&self, product_id: ProductId) -> Result<bool> {
        let product = self.product(product_id)?;
        self.favorites()?.toggle(product).await
    }

    /// Turn the cart into a processing order placed at `now`.
    ///
    /// The ordered units leave the cart only after the order has been stored;
    /// if storing the order fails the cart is untouched. Units added while the
    /// checkout runs stay in the cart. Checkouts of one account run one at a
    /// time.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::InvalidArgument` if the cart is empty, and
    /// `StorefrontError::Storage` if the order cannot be stored.
    #[instrument(skip(self), fields(account_id = %self.user.id))]
    pub async fn checkout(&self, now: DateTime<Utc>) -> Result<Order> {
        let cart = self.cart()?;
        let _checkout = self.ledgers.checkout.lock().await;

        let entries = cart.list_items().await?;
        if entries.is_empty() {
            return Err(StorefrontError::InvalidArgument("Your cart is empty".to_string()));
        }

        let line_items: Vec<LineItem> = entries.iter().map(LineItem::from).collect();
        let ordered: Vec<(ProductId, u32)> = line_items
            .iter()
            .map(|line| (line.product_id, line.quantity))
            .collect();
        let order = self.ledgers.orders.place(line_items, now).await?;

        // The order exists at this point; lines left behind by a failed
        // deduction must not report the checkout as failed.
        if let Err(e) = cart.deduct(&ordered).await {
            error!(order_id = %order.id, error = %e, "Order placed but cart could not be updated");
            report(&e);
        }

        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_number", order.order_number.as_str())]),
        );
        info!(order_number = %order.order_number, total = %order.total_amount, "Checkout complete");
        Ok(order)
    }

    /// Put every line of a past order back into the cart.
    ///
    /// Lines are priced from the current catalog when the product still
    /// exists, otherwise from the order's snapshot. Returns the number of
    /// units added.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` for an unknown order, or any error
    /// from [`CartLedger::add_item`].
    #[instrument(skip(self), fields(account_id = %self.user.id))]
    pub async fn reorder(&self, order_id: OrderId) -> Result<u32> {
        let cart = self.cart()?;
        let order = self
            .ledgers
            .orders
            .get(order_id, Utc::now())
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("order {order_id}")))?;

        let mut added = 0u32;
        for line in &order.line_items {
            let product = self
                .catalog
                .get(line.product_id)
                .cloned()
                .unwrap_or_else(|| snapshot_product(line));
            cart.add_item(&product, line.quantity).await?;
            added = added.saturating_add(line.quantity);
        }
        Ok(added)
    }
}

fn snapshot_product(line: &LineItem) -> Product {
    Product {
        id: line.product_id,
        name: line.name.clone(),
        price: line.unit_price,
        original_price: None,
        image: line.image_ref.clone(),
        category: String::new(),
        description: String::new(),
        in_stock: true,
        stock_count: None,
        rating: None,
        review_count: None,
        discount_percent: None,
    }
}

/// Entry point binding a store, an authentication gateway and a catalog.
pub struct Storefront<S, A> {
    store: Arc<S>,
    auth: Arc<A>,
    catalog: Catalog,
    seed_demo_orders: bool,
    accounts: Mutex<HashMap<AccountId, Arc<AccountLedgers<S>>>>,
}

impl<S: KeyValueStore, A: AuthGateway> Storefront<S, A> {
    #[must_use]
    pub fn new(store: Arc<S>, auth: Arc<A>, catalog: Catalog) -> Self {
        Self {
            store,
            auth,
            catalog,
            seed_demo_orders: false,
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the demo order history into sessions whose history is empty.
    #[must_use]
    pub fn with_demo_orders(mut self, enabled: bool) -> Self {
        self.seed_demo_orders = enabled;
        self
    }

    #[must_use]
    pub fn auth(&self) -> &A {
        &self.auth
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Open the shopping context of the signed-in account.
    ///
    /// Sessions of the same account share its ledgers. Opening a session
    /// re-reads them from the store, so changes written by another process
    /// since the last session show up.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Unauthenticated` if nobody is signed in, and
    /// `StorefrontError::Storage` if demo orders cannot be seeded.
    pub async fn open_session(&self) -> Result<StoreSession<S>> {
        let user = self.auth.current_user().ok_or(StorefrontError::Unauthenticated)?;
        let ledgers = self.ledgers_for(user.id);
        ledgers.reload().await;

        if self.seed_demo_orders && ledgers.orders.seed_demo_orders(Utc::now()).await? {
            info!(account_id = %user.id, "Seeded demo orders");
        }
        Ok(StoreSession {
            user,
            presence: self.auth.subscribe(),
            catalog: self.catalog.clone(),
            ledgers,
        })
    }

    fn ledgers_for(&self, account_id: AccountId) -> Arc<AccountLedgers<S>> {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            accounts
                .entry(account_id)
                .or_insert_with(|| Arc::new(AccountLedgers::new(&self.store, account_id))),
        )
    }

    /// Sign out. Open sessions stop accepting operations.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Auth` if the gateway fails.
    pub async fn sign_out(&self) -> Result<()> {
        Ok(self.auth.sign_out().await?)
    }
}
