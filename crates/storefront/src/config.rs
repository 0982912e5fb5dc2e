//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `FURNI_DATA_DIR` - Directory for the file-backed store (default: .furni)
//! - `FURNI_STORAGE_TIMEOUT_MS` - Bound on each storage operation (default: 2000)
//! - `FURNI_ORDER_POLL_SECS` - Order lifecycle refresh period (default: 60)
//! - `FURNI_SEED_DEMO_ORDERS` - Seed demo orders for new accounts (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Fraction of errors sent to Sentry, 0.0 to 1.0 (default: 1.0)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_DATA_DIR: &str = ".furni";
const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 2000;
const DEFAULT_ORDER_POLL_SECS: u64 = 60;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Root directory of the file-backed store
    pub data_dir: PathBuf,
    /// Upper bound on a single storage operation
    pub storage_timeout: Duration,
    /// How often the order poller refreshes lifecycle state
    pub order_poll_period: Duration,
    /// Whether a new account starts with the demo order history
    pub seed_demo_orders: bool,
    /// Error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage_timeout: Duration::from_millis(DEFAULT_STORAGE_TIMEOUT_MS),
            order_poll_period: Duration::from_secs(DEFAULT_ORDER_POLL_SECS),
            seed_demo_orders: true,
            sentry: SentryConfig::default(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let data_dir = env
            .optional("FURNI_DATA_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
        let storage_timeout_ms: u64 =
            env.parsed_or("FURNI_STORAGE_TIMEOUT_MS", DEFAULT_STORAGE_TIMEOUT_MS)?;
        let order_poll_secs: u64 = env.parsed_or("FURNI_ORDER_POLL_SECS", DEFAULT_ORDER_POLL_SECS)?;
        if storage_timeout_ms == 0 {
            return Err(invalid("FURNI_STORAGE_TIMEOUT_MS", "must be greater than zero"));
        }
        if order_poll_secs == 0 {
            return Err(invalid("FURNI_ORDER_POLL_SECS", "must be greater than zero"));
        }
        let seed_demo_orders = match env.optional("FURNI_SEED_DEMO_ORDERS") {
            None => true,
            Some(value) => parse_bool("FURNI_SEED_DEMO_ORDERS", &value)?,
        };

        let sample_rate: f32 = env.parsed_or("SENTRY_SAMPLE_RATE", 1.0)?;
        if !(0.0..=1.0).contains(&sample_rate) {
            return Err(invalid("SENTRY_SAMPLE_RATE", "must be between 0.0 and 1.0"));
        }

        Ok(Self {
            data_dir,
            storage_timeout: Duration::from_millis(storage_timeout_ms),
            order_poll_period: Duration::from_secs(order_poll_secs),
            seed_demo_orders,
            sentry: SentryConfig {
                dsn: env.optional("SENTRY_DSN"),
                environment: env.optional("SENTRY_ENVIRONMENT"),
                sample_rate,
            },
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value.parse().map_err(|e: T::Err| invalid(key, &e.to_string()))
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, &format!("expected a boolean, got `{value}`"))),
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = load(&[]).unwrap();
        let defaults = StorefrontConfig::default();
        assert_eq!(config.data_dir, defaults.data_dir);
        assert_eq!(config.storage_timeout, Duration::from_secs(2));
        assert_eq!(config.order_poll_period, Duration::from_secs(60));
        assert!(config.seed_demo_orders);
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("FURNI_DATA_DIR", "/tmp/furni"),
            ("FURNI_STORAGE_TIMEOUT_MS", "500"),
            ("FURNI_ORDER_POLL_SECS", "5"),
            ("FURNI_SEED_DEMO_ORDERS", "off"),
            ("SENTRY_DSN", "https://key@sentry.example/1"),
            ("SENTRY_SAMPLE_RATE", "0.25"),
        ])
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/furni"));
        assert_eq!(config.storage_timeout, Duration::from_millis(500));
        assert_eq!(config.order_poll_period, Duration::from_secs(5));
        assert!(!config.seed_demo_orders);
        assert_eq!(config.sentry.dsn.as_deref(), Some("https://key@sentry.example/1"));
        assert!((config.sentry.sample_rate - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("FURNI_ORDER_POLL_SECS", "  "), ("SENTRY_DSN", "")]).unwrap();
        assert_eq!(config.order_poll_period, Duration::from_secs(60));
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("FURNI_STORAGE_TIMEOUT_MS", "soon"),
            ("FURNI_STORAGE_TIMEOUT_MS", "0"),
            ("FURNI_ORDER_POLL_SECS", "-1"),
            ("FURNI_SEED_DEMO_ORDERS", "maybe"),
            ("SENTRY_SAMPLE_RATE", "1.5"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            let ConfigError::InvalidEnvVar(name, _) = err;
            assert_eq!(name, key);
        }
    }
}
