//! Cart item domain types.

use serde::Serialize;

use product_manager_core::{CartItemId, ProductId, Quantity, UserId};

/// A cart line as stored: one per (user, product) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Result of the atomic create-or-increment primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartUpsert {
    pub item: CartItem,
    /// `true` when the row did not exist before this call.
    pub created: bool,
}
