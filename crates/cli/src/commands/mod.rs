//! Command implementations.
//!
//! Every invocation opens the file-backed store under `FURNI_DATA_DIR`, so
//! state carries over between runs the way it would on a device.

mod account;
mod browse;
mod cart;
mod favorites;
mod orders;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use furni_storefront::{
    AuthError, Catalog, CatalogError, FileStore, LocalAuthGateway, StoreSession, Storefront,
    StorefrontConfig, StorefrontError,
};

use crate::{Cli, Commands};

/// The storefront as wired for the CLI.
pub type App = Storefront<FileStore, LocalAuthGateway<FileStore>>;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        Self::Storefront(err.into())
    }
}

impl CliError {
    /// Message to show on the terminal.
    pub fn user_message(&self) -> String {
        match self {
            Self::Storefront(err) => err.user_message(),
            Self::Catalog(err) => err.to_string(),
        }
    }

    /// Log the error, sending device failures to Sentry.
    pub fn report(&self) {
        match self {
            Self::Storefront(err) => furni_storefront::error::report(err),
            Self::Catalog(err) => tracing::warn!(error = %err, "Catalog could not be loaded"),
        }
    }
}

/// Run a parsed command line.
pub async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let catalog = load_catalog(cli.catalog.as_deref())?;

    if let Commands::Catalog { action } = cli.command {
        return browse::run(&catalog, action);
    }

    let app = open(&config, catalog).await?;
    match cli.command {
        Commands::Auth { action } => account::run(&app, action).await,
        Commands::Cart { action } => cart::run(&session(&app).await?, action).await,
        Commands::Favorites { action } => favorites::run(&session(&app).await?, action).await,
        Commands::Orders { action } => {
            orders::run(&session(&app).await?, action, config.order_poll_period).await
        }
        Commands::Catalog { .. } => Ok(()),
    }
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog, CatalogError> {
    path.map_or_else(Catalog::builtin, Catalog::from_path)
}

async fn open(config: &StorefrontConfig, catalog: Catalog) -> Result<App, CliError> {
    let store = Arc::new(FileStore::new(config.data_dir.clone()).with_timeout(config.storage_timeout));
    let auth = Arc::new(LocalAuthGateway::open(Arc::clone(&store)).await?);
    Ok(Storefront::new(store, auth, catalog).with_demo_orders(config.seed_demo_orders))
}

async fn session(app: &App) -> Result<StoreSession<FileStore>, CliError> {
    Ok(app.open_session().await?)
}
