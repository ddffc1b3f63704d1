//! Catalog records: product details and stock snapshots.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::{CurrencyCode, Price};

/// A product record as served by the catalog.
///
/// Fields the cart doesn't interpret are kept in `extra` so the record
/// round-trips through storage unchanged. Keys a [`LineItem`] writes next to
/// the product (see [`LINE_ITEM_FIELDS`]) are dropped from `extra` on the way
/// in, so a stored line item never carries them twice.
///
/// [`LineItem`]: super::cart::LineItem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProductRecord")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// Unit price; stored as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Keys owned by the line item a product is flattened into.
pub const LINE_ITEM_FIELDS: &[&str] = &["amount"];

#[derive(Deserialize)]
struct ProductRecord {
    id: ProductId,
    title: String,
    #[serde(deserialize_with = "rust_decimal::serde::float::deserialize")]
    price: Decimal,
    #[serde(default)]
    image: String,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl From<ProductRecord> for Product {
    fn from(mut record: ProductRecord) -> Self {
        for field in LINE_ITEM_FIELDS {
            record.extra.remove(*field);
        }
        Self {
            id: record.id,
            title: record.title,
            price: record.price,
            image: record.image,
            extra: record.extra,
        }
    }
}

impl Product {
    /// Create a product with no extra attributes.
    #[must_use]
    pub fn new(id: ProductId, title: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            image: String::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Set the image URL.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Unit price in the given currency.
    #[must_use]
    pub const fn unit_price(&self, currency_code: CurrencyCode) -> Price {
        Price::new(self.price, currency_code)
    }
}

/// Available stock for one product at the moment it was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockInfo {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    #[serde(rename = "amount")]
    pub available_amount: u32,
}

impl StockInfo {
    #[must_use]
    pub const fn new(product_id: ProductId, available_amount: u32) -> Self {
        Self {
            product_id,
            available_amount,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_keeps_unknown_fields() {
        let raw = json!({
            "id": 1,
            "title": "Tênis de Caminhada Leve Confortável",
            "price": 139.5,
            "image": "https://example.com/tenis1.jpg",
            "brand": "RocketShoes"
        });

        let product: Product = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(product.id, ProductId::new(1));
        assert_eq!(product.price, Decimal::new(1395, 1));
        assert_eq!(product.extra.get("brand"), Some(&json!("RocketShoes")));

        assert_eq!(serde_json::to_value(&product).unwrap(), raw);
    }

    #[test]
    fn test_product_drops_line_item_fields() {
        let product: Product = serde_json::from_value(json!({
            "id": 1,
            "title": "Tênis de Caminhada Leve Confortável",
            "price": 139.5,
            "amount": 7,
            "brand": "RocketShoes"
        }))
        .unwrap();

        assert!(!product.extra.contains_key("amount"));
        assert_eq!(product.extra.get("brand"), Some(&json!("RocketShoes")));
    }

    #[test]
    fn test_product_image_is_optional() {
        let product: Product =
            serde_json::from_value(json!({"id": 2, "title": "Boot", "price": 99})).unwrap();
        assert!(product.image.is_empty());
    }

    #[test]
    fn test_stock_info_wire_names() {
        let stock: StockInfo = serde_json::from_value(json!({"id": 3, "amount": 5})).unwrap();
        assert_eq!(stock, StockInfo::new(ProductId::new(3), 5));
    }
}
