//! Cart operation errors.
//!
//! Every failed operation returns a `CartError` to the caller and also
//! reports a user-facing message through the notification sink. UIs that only
//! show toasts can ignore the `Result`; UIs that want to react per failure
//! class use [`CartError::kind`].

use rocketshoes_core::ProductId;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::storage::StorageError;

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested amount is below one.
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Product has no line item in the cart.
    #[error("Product {0} is not in the cart")]
    NotInCart(ProductId),

    /// Not enough stock for the requested amount.
    #[error("Out of stock: product {product_id} requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: u64,
        available: u32,
    },

    /// Catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Persisting the cart failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The cart store task has stopped.
    #[error("Cart store is closed")]
    StoreClosed,
}

/// Failure class of a [`CartError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected before any network call.
    Validation,
    /// Rejected after a stock check.
    OutOfStock,
    /// Catalog unreachable or returned an error.
    Transport,
    /// Local persistence or the store itself failed.
    Internal,
}

impl CartError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) | Self::NotInCart(_) => ErrorKind::Validation,
            Self::OutOfStock { .. } => ErrorKind::OutOfStock,
            Self::Catalog(_) => ErrorKind::Transport,
            Self::Storage(_) | Self::StoreClosed => ErrorKind::Internal,
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        let err = CartError::OutOfStock {
            product_id: ProductId::new(1),
            requested: 3,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Out of stock: product 1 requested 3, available 2"
        );

        let err = CartError::NotInCart(ProductId::new(9));
        assert_eq!(err.to_string(), "Product 9 is not in the cart");
    }

    #[test]
    fn test_cart_error_kinds() {
        assert_eq!(CartError::InvalidAmount(0).kind(), ErrorKind::Validation);
        assert_eq!(
            CartError::NotInCart(ProductId::new(1)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CartError::Catalog(CatalogError::RateLimited(1)).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            CartError::Storage(StorageError::Unavailable("disk".to_string())).kind(),
            ErrorKind::Internal
        );
        assert_eq!(CartError::StoreClosed.kind(), ErrorKind::Internal);
    }
}
