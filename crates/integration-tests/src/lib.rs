//! Integration tests for Furni.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p furni-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `shopping_flow` - Sign-up through checkout and cancellation on a file-backed store
//! - `persistence` - State surviving a restart, account isolation, corrupt data
//! - `properties` - Property tests for ledger and lifecycle invariants
//!
//! Tests run against a [`TestContext`]: a storefront over a [`FileStore`] in a
//! temporary directory that is deleted when the context is dropped.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::Path;
use std::sync::Arc;

use secrecy::SecretString;
use tempfile::TempDir;

use furni_core::{Price, Product, ProductId};
use furni_storefront::{
    AuthGateway, Catalog, FileStore, LocalAuthGateway, StoreSession, Storefront,
};

/// Password used for every test account.
pub const PASSWORD: &str = "Secret123";

/// Storefront wired to a file store, as the CLI wires it.
pub type FileStorefront = Storefront<FileStore, LocalAuthGateway<FileStore>>;

/// A storefront over a throwaway data directory.
pub struct TestContext {
    dir: TempDir,
    pub storefront: FileStorefront,
}

impl TestContext {
    /// Create a context with an empty data directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory or the storefront cannot be created.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let storefront = open_storefront(dir.path()).await;
        Self { dir, storefront }
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Open a second storefront over the same directory, as a new process would.
    ///
    /// # Panics
    ///
    /// Panics if the storefront cannot be opened.
    pub async fn reopen(&self) -> FileStorefront {
        open_storefront(self.dir.path()).await
    }

    /// Sign up `email` and open its session.
    ///
    /// # Panics
    ///
    /// Panics if sign-up or opening the session fails.
    pub async fn signed_up(&self, email: &str) -> StoreSession<FileStore> {
        self.storefront
            .auth()
            .sign_up(email, &password())
            .await
            .expect("sign up");
        self.storefront.open_session().await.expect("open session")
    }
}

/// The shared test password as a secret.
#[must_use]
pub fn password() -> SecretString {
    SecretString::from(PASSWORD.to_string())
}

/// Open a storefront over `dir` with the built-in catalog.
///
/// # Panics
///
/// Panics if the catalog or the stored auth session cannot be loaded.
pub async fn open_storefront(dir: &Path) -> FileStorefront {
    let store = Arc::new(FileStore::new(dir));
    let auth = LocalAuthGateway::open(Arc::clone(&store))
        .await
        .expect("open auth gateway");
    let catalog = Catalog::builtin().expect("built-in catalog");
    Storefront::new(store, Arc::new(auth), catalog)
}

/// A minimal product priced in cents.
#[must_use]
pub fn product(id: i32, cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Test product {id}"),
        price: Price::from_cents(cents),
        original_price: None,
        image: format!("product-{id}.jpg"),
        category: "Decor".to_string(),
        description: String::new(),
        in_stock: true,
        stock_count: None,
        rating: None,
        review_count: None,
        discount_percent: None,
    }
}
