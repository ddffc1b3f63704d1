//! RocketShoes cart CLI - drive the cart store from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the stored cart
//! rs-cart show
//!
//! # Add one unit of product 3
//! rs-cart add 3
//!
//! # Set product 3 to two units
//! rs-cart update 3 2
//!
//! # Remove product 3, printing the cart as JSON
//! rs-cart --json remove 3
//! ```
//!
//! # Commands
//!
//! - `show` - Print the cart and its total
//! - `add` - Add a product, or one more unit of it
//! - `remove` - Remove a product
//! - `update` - Set a product's amount
//!
//! Configuration comes from the environment (see `rocketshoes_cart::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rocketshoes_cart::catalog::HttpCatalog;
use rocketshoes_cart::config::{CartConfig, LogFormat};
use rocketshoes_cart::notify::TracingNotifier;
use rocketshoes_cart::storage::FileStore;
use rocketshoes_cart::{CartHandle, CartStore};
use rocketshoes_core::ProductId;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(name = "rs-cart")]
#[command(author, version, about = "RocketShoes cart tools")]
struct Cli {
    /// Print the cart as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: ProductId,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        product_id: ProductId,
    },
    /// Set the amount of a product already in the cart
    Update {
        /// Product ID
        product_id: ProductId,

        /// New amount (must be at least 1 and within stock)
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
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

/// Install the tracing subscriber. Logs go to stderr so stdout stays parseable.
fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rocketshoes_cart=info,rs_cart=info".into());

    let (pretty, json) = match format {
        LogFormat::Pretty => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(json)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Compose the store from configuration.
async fn open_cart(config: &CartConfig) -> Result<CartHandle, Box<dyn std::error::Error>> {
    let catalog = HttpCatalog::new(&config.catalog)?;
    let storage = FileStore::new(&config.storage.dir);

    let cart = CartStore::new(
        Arc::new(catalog),
        Arc::new(storage),
        Arc::new(TracingNotifier),
    )
    .with_key(config.storage.key.as_str())
    .with_queue_capacity(config.queue_capacity)
    .spawn()
    .await;

    Ok(cart)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CartConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // No subscriber yet; install the default one to report the failure.
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    let result = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &CartConfig) -> Result<(), Box<dyn std::error::Error>> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let cart = open_cart(config).await?;

    match cli.command {
        Commands::Show => commands::cart::show(&cart, format)?,
        Commands::Add { product_id } => commands::cart::add(&cart, product_id, format).await?,
        Commands::Remove { product_id } => {
            commands::cart::remove(&cart, product_id, format).await?;
        }
        Commands::Update { product_id, amount } => {
            commands::cart::update(&cart, product_id, amount, format).await?;
        }
    }
    Ok(())
}
