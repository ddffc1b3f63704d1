//! Cart commands.
//!
//! Every command prints the resulting cart, including when the operation
//! failed (the cart is then unchanged), and returns the operation's error.
//!
//! # Usage
//!
//! ```bash
//! rs-cart add 1
//! rs-cart update 1 3
//! rs-cart --json show
//! ```

use std::io::{self, Write};

use rocketshoes_cart::{CartError, CartEvent, CartHandle};
use rocketshoes_core::{Cart, CurrencyCode, Price, ProductId, UpdateProductAmount};
use rust_decimal::Decimal;

use super::OutputFormat;

/// Width of the product title column.
const TITLE_WIDTH: usize = 36;

/// Print the current cart.
pub fn show(cart: &CartHandle, format: OutputFormat) -> io::Result<()> {
    print_cart(&cart.cart(), format)
}

/// Add one unit of a product.
pub async fn add(
    cart: &CartHandle,
    product_id: ProductId,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = cart.add_product(product_id).await;
    finish(cart, result, format)
}

/// Remove a product.
pub async fn remove(
    cart: &CartHandle,
    product_id: ProductId,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = cart.remove_product(product_id).await;
    finish(cart, result, format)
}

/// Set a product's amount.
pub async fn update(
    cart: &CartHandle,
    product_id: ProductId,
    amount: i64,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = cart
        .update_product_amount(UpdateProductAmount { product_id, amount })
        .await;
    finish(cart, result, format)
}

fn finish(
    cart: &CartHandle,
    result: Result<CartEvent, CartError>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(event) = &result {
        tracing::debug!(?event, "Cart updated");
    }
    print_cart(&cart.cart(), format)?;
    result.map(|_| ()).map_err(Into::into)
}

fn print_cart(cart: &Cart, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Table => render_table(cart, &mut out),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, cart)?;
            writeln!(out)
        }
    }
}

/// Render the cart as an aligned table followed by the total.
pub fn render_table(cart: &Cart, out: &mut impl Write) -> io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Cart is empty");
    }

    writeln!(
        out,
        "{:>5}  {:<TITLE_WIDTH$}  {:>5}  {:>12}  {:>12}",
        "ID", "PRODUCT", "QTY", "PRICE", "SUBTOTAL"
    )?;
    for item in cart {
        writeln!(
            out,
            "{:>5}  {:<TITLE_WIDTH$}  {:>5}  {:>12}  {:>12}",
            item.product_id(),
            truncate(&item.product.title, TITLE_WIDTH),
            item.amount,
            brl(item.product.price).display(),
            brl(item.subtotal()).display(),
        )?;
    }

    let units = cart.total_quantity();
    writeln!(
        out,
        "Total: {} ({} {}, {} {})",
        brl(cart.total()).display(),
        cart.len(),
        if cart.len() == 1 { "product" } else { "products" },
        units,
        if units == 1 { "unit" } else { "units" },
    )
}

const fn brl(amount: Decimal) -> Price {
    Price::new(amount, CurrencyCode::BRL)
}

fn truncate(title: &str, width: usize) -> String {
    if title.chars().count() <= width {
        return title.to_string();
    }
    let mut short: String = title.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}
