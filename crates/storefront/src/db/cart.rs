//! Cart item repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use product_manager_core::{CartItemId, CartLine, Price, ProductId, Quantity, UserId};

use super::RepositoryError;
use crate::models::{CartItem, CartUpsert};

#[derive(sqlx::FromRow)]
struct CartUpsertRow {
    id: i32,
    user_id: i32,
    product_id: i32,
    quantity: i32,
    created: bool,
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    item_id: i32,
    product_id: i32,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
}

fn quantity(item_id: i32, raw: i32) -> Result<Quantity, RepositoryError> {
    Quantity::new(raw).ok_or_else(|| {
        RepositoryError::DataCorruption(format!("cart item {item_id} has quantity {raw}"))
    })
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let unit_price = Price::new(row.unit_price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.product_id))
        })?;

        Ok(Self {
            item_id: CartItemId::new(row.item_id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            unit_price,
            quantity: quantity(row.item_id, row.quantity)?,
        })
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert the (user, product) line or add to its quantity in one statement.
    ///
    /// `xmax = 0` holds only for a freshly inserted tuple, which tells the
    /// two outcomes apart without a second query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add_or_increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity_to_add: Quantity,
    ) -> Result<CartUpsert, RepositoryError> {
        let row = sqlx::query_as::<_, CartUpsertRow>(
            r"
            INSERT INTO storefront.cart_item (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_item.quantity + EXCLUDED.quantity
            RETURNING id, user_id, product_id, quantity, (xmax = 0) AS created
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity_to_add.get())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(CartUpsert {
            item: CartItem {
                id: CartItemId::new(row.id),
                user_id: UserId::new(row.user_id),
                product_id: ProductId::new(row.product_id),
                quantity: quantity(row.id, row.quantity)?,
            },
            created: row.created,
        })
    }

    /// A user's cart lines with current product names and prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT c.id AS item_id, p.id AS product_id, p.name AS product_name,
                   p.price AS unit_price, c.quantity
            FROM storefront.cart_item c
            JOIN storefront.product p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    /// Delete a cart line, but only if `user_id` owns it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(&self, user_id: UserId, item_id: CartItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart_item WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
