//! CLI command implementations.

pub mod cart;

/// How the cart is printed after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}
