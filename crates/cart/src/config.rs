//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `CART_API_BASE_URL` - Catalog/stock service URL (default: `http://localhost:3333`)
//! - `CART_API_TOKEN` - Bearer token for the catalog service
//! - `CART_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `CART_PRODUCT_CACHE_TTL_SECS` - Product details cache TTL, 0 disables (default: 300)
//! - `CART_STORAGE_DIR` - Directory for the persisted cart (default: `.rocketshoes`)
//! - `CART_STORAGE_KEY` - Key the cart blob is stored under (default: `@RocketShoes:cart`)
//! - `CART_QUEUE_CAPACITY` - Pending command bound for the cart store (default: 32)
//! - `CART_LOG_FORMAT` - `pretty` or `json` (default: `pretty`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Storage key used when `CART_STORAGE_KEY` is unset.
pub const DEFAULT_STORAGE_KEY: &str = "@RocketShoes:cart";

const DEFAULT_BASE_URL: &str = "http://localhost:3333";
const DEFAULT_STORAGE_DIR: &str = ".rocketshoes";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart application configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Catalog/stock service configuration
    pub catalog: CatalogConfig,
    /// Cart persistence configuration
    pub storage: StorageConfig,
    /// Bound on commands waiting for the cart store
    pub queue_capacity: usize,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Catalog/stock service configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Base URL; `products/{id}` and `stock/{id}` are resolved against it
    pub base_url: Url,
    /// Optional bearer token
    pub api_token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long product details stay cached; zero disables the cache
    pub product_cache_ttl: Duration,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("product_cache_ttl", &self.product_cache_ttl)
            .finish()
    }
}

impl CatalogConfig {
    /// Configuration for a catalog at `base_url` with default timeouts.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            product_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }

    /// Exposes the token for building the `Authorization` header.
    pub(crate) fn bearer_token(&self) -> Option<&str> {
        self.api_token.as_ref().map(ExposeSecret::expose_secret)
    }
}

/// Cart persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding one file per key
    pub dir: PathBuf,
    /// Key the serialized cart is stored under
    pub key: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable can't be parsed or the API token
    /// can't be sent as a header value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`CartConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let base_url = env.parsed::<Url>("CART_API_BASE_URL", DEFAULT_BASE_URL)?;
        let api_token = env
            .optional("CART_API_TOKEN")
            .map(|token| validated_token(&token, "CART_API_TOKEN"))
            .transpose()?;
        let timeout = Duration::from_secs(
            env.parsed::<u64>("CART_HTTP_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string())?,
        );
        let product_cache_ttl = Duration::from_secs(env.parsed::<u64>(
            "CART_PRODUCT_CACHE_TTL_SECS",
            &DEFAULT_CACHE_TTL_SECS.to_string(),
        )?);

        let storage = StorageConfig {
            dir: PathBuf::from(env.or_default("CART_STORAGE_DIR", DEFAULT_STORAGE_DIR)),
            key: env.or_default("CART_STORAGE_KEY", DEFAULT_STORAGE_KEY),
        };

        let queue_capacity = env.parsed::<usize>(
            "CART_QUEUE_CAPACITY",
            &DEFAULT_QUEUE_CAPACITY.to_string(),
        )?;
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CART_QUEUE_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let log_format = env.parsed::<LogFormat>("CART_LOG_FORMAT", "pretty")?;
        let sentry_dsn = env.optional("SENTRY_DSN");

        Ok(Self {
            catalog: CatalogConfig {
                base_url,
                api_token,
                timeout,
                product_cache_ttl,
            },
            storage,
            queue_capacity,
            log_format,
            sentry_dsn,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating empty values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a variable parsed into `T`, falling back to `default`.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Tokens are issued by the catalog service; only check they fit in a header.
fn validated_token(value: &str, var_name: &str) -> Result<SecretString, ConfigError> {
    let value = value.trim().to_string();
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must not contain whitespace or control characters".to_string(),
        ));
    }
    Ok(SecretString::from(value))
}
