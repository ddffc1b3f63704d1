//! RocketShoes cart library.
//!
//! A single-writer cart store that validates additions and updates against a
//! remote stock service and mirrors the cart into a key-value store after
//! every committed change.
//!
//! # Architecture
//!
//! - [`store`] - The cart actor and the cloneable [`CartHandle`] used by the UI
//! - [`catalog`] - Product and stock lookups (HTTP client plus an in-memory fake)
//! - [`storage`] - Key-value persistence for the serialized cart
//! - [`notify`] - Fire-and-forget user notifications
//! - [`config`] - Environment-driven configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use rocketshoes_cart::{CartStore, config::CartConfig};
//!
//! let config = CartConfig::from_env()?;
//! let catalog = HttpCatalog::new(&config.catalog)?;
//! let storage = FileStore::new(&config.storage.dir);
//!
//! let cart = CartStore::new(Arc::new(catalog), Arc::new(storage), Arc::new(TracingNotifier))
//!     .with_key(&config.storage.key)
//!     .spawn()
//!     .await;
//!
//! cart.add_product(ProductId::new(1)).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod store;

pub use error::{CartError, ErrorKind, Result};
pub use store::{CartEvent, CartHandle, CartStore};
