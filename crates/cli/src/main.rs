//! Furni CLI - the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Create an account (password may also come from FURNI_PASSWORD)
//! furni auth sign-up -e ada@example.com -p hunter22
//!
//! # Browse and shop
//! furni catalog list --category lamps
//! furni cart add 13 -q 2
//! furni cart checkout
//!
//! # Follow orders through their lifecycle
//! furni orders list
//! furni orders watch --period 5
//! ```
//!
//! # Commands
//!
//! - `auth` - Sign up, sign in, sign out, reset password, show current account
//! - `catalog` - List products and categories
//! - `cart` - Manage the cart and check out
//! - `favorites` - Manage favorites
//! - `orders` - List, cancel, reorder and watch orders

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use furni_core::{OrderId, ProductId};
use furni_storefront::StorefrontConfig;
use furni_storefront::config::SentryConfig;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "furni")]
#[command(author, version, about = "Furni furniture store")]
struct Cli {
    /// Load products from this YAML file instead of the built-in catalog
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the signed-in account
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Browse products
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Track orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Create an account and sign in
    SignUp {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "FURNI_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in to an existing account
    SignIn {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "FURNI_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out
    SignOut,
    /// Request a password reset
    ResetPassword {
        #[arg(short, long)]
        email: String,
    },
    /// Show the signed-in account
    Whoami,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List products
    List {
        /// Only products in this category
        #[arg(short, long)]
        category: Option<String>,
        /// Only products whose name or category contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List categories
    Categories,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    List,
    /// Add a product
    Add {
        id: ProductId,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product
    Remove { id: ProductId },
    /// Set a product's quantity; zero or less removes it
    Set {
        id: ProductId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
    /// Place an order for everything in the cart
    Checkout,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// Show favorites
    List,
    /// Mark or unmark a product
    Toggle { id: ProductId },
    /// Unmark a product
    Remove { id: ProductId },
    /// Remove every favorite
    Clear,
    /// Add a favorite to the cart
    ToCart { id: ProductId },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Show order history
    List,
    /// Cancel an order placed less than 10 minutes ago
    Cancel { id: OrderId },
    /// Put a past order's items back in the cart
    Reorder { id: OrderId },
    /// Refresh order status periodically until interrupted
    Watch {
        /// Seconds between refreshes (default: FURNI_ORDER_POLL_SECS)
        #[arg(long)]
        period: Option<u64>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SentryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config.environment.clone().map(std::borrow::Cow::Owned),
            sample_rate: config.sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::failure(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config.sentry);

    // Log to stderr so command output stays clean; quiet unless RUST_LOG is set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "furni=warn,furni_storefront=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    match commands::run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            output::failure(&e.user_message());
            ExitCode::FAILURE
        }
    }
}
