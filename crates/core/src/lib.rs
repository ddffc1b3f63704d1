//! RocketShoes Core - Shared cart types.
//!
//! This crate provides the domain types used across all RocketShoes components:
//! - `cart` - The cart store, catalog client, and storage adapters
//! - `cli` - Command-line front end for the cart store
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe product IDs, prices, products, line items and carts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
