//! Cart arithmetic and confirmation text.
//!
//! Totals are always derived from the current product prices; nothing here is
//! persisted.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{CartItemId, Price, ProductId, Quantity};

/// One cart line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Price,
    pub quantity: Quantity,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.times(self.quantity.get())
    }
}

/// Sum of every line total.
#[must_use]
pub fn order_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}

/// Confirmation shown after an add-to-cart.
///
/// `added` is the quantity from this request and `total` the line quantity
/// after it was applied.
#[must_use]
pub fn add_confirmation(product_name: &str, added: Quantity, total: Quantity, created: bool) -> String {
    if created {
        format!("Added {added} x {product_name} to cart!")
    } else {
        format!("Added {added} more {product_name}(s)! Total: {total}")
    }
}
