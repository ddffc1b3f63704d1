//! Cart line items and the ordered cart sequence.
//!
//! [`Cart`] is a value type: every mutation helper returns a new cart and
//! leaves `self` untouched, so a caller can persist the candidate before
//! committing it.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::Product;

/// One product in the cart with its quantity.
///
/// Serializes flat: the product's fields followed by `amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(flatten)]
    pub product: Product,
    pub amount: u32,
}

impl LineItem {
    #[must_use]
    pub const fn new(product: Product, amount: u32) -> Self {
        Self { product, amount }
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product.id
    }

    /// `price × amount`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.product.price * Decimal::from(self.amount)
    }
}

/// Request to set a line item's quantity.
///
/// `amount` is signed because it comes straight from user input and is
/// validated by the cart store, not by the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    pub amount: i64,
}

/// Ordered sequence of line items, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from untrusted items, restoring the invariants.
    ///
    /// Keeps the first line item for each product and drops items with a
    /// zero amount. Returns the cart and the number of items dropped.
    #[must_use]
    pub fn normalize(items: Vec<LineItem>) -> (Self, usize) {
        let original_len = items.len();
        let mut seen = HashSet::with_capacity(original_len);
        let items: Vec<LineItem> = items
            .into_iter()
            .filter(|item| item.amount > 0 && seen.insert(item.product_id()))
            .collect();
        let dropped = original_len - items.len();
        (Self { items }, dropped)
    }

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    /// Number of distinct products.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.product_id() == product_id)
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.get(product_id).is_some()
    }

    /// Sum of all amounts.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.amount)).sum()
    }

    /// Sum of all line subtotals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    /// A copy with `product` appended at `amount = 1`.
    ///
    /// Returns `None` if the product is already in the cart.
    #[must_use]
    pub fn with_added(&self, product: Product) -> Option<Self> {
        if self.contains(product.id) {
            return None;
        }
        let mut items = self.items.clone();
        items.push(LineItem::new(product, 1));
        Some(Self { items })
    }

    /// A copy with the product's amount replaced.
    ///
    /// Returns `None` if the product is not in the cart.
    #[must_use]
    pub fn with_amount(&self, product_id: ProductId, amount: u32) -> Option<Self> {
        if !self.contains(product_id) {
            return None;
        }
        let items = self
            .items
            .iter()
            .map(|item| {
                if item.product_id() == product_id {
                    LineItem::new(item.product.clone(), amount)
                } else {
                    item.clone()
                }
            })
            .collect();
        Some(Self { items })
    }

    /// A copy without the product, order of the rest preserved.
    ///
    /// Returns `None` if the product is not in the cart.
    #[must_use]
    pub fn without(&self, product_id: ProductId) -> Option<Self> {
        if !self.contains(product_id) {
            return None;
        }
        let items = self
            .items
            .iter()
            .filter(|item| item.product_id() != product_id)
            .cloned()
            .collect();
        Some(Self { items })
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
