//! Per-user cart operations.
//!
//! Every call takes the requesting [`CurrentUser`] explicitly and only ever
//! touches that user's lines.

use rust_decimal::Decimal;
use tracing::instrument;

use product_manager_core::{
    CartItemId, CartLine, ProductId, Quantity, QuantityWarning, add_confirmation, order_total,
};

use super::ServiceError;
use crate::db::{CartStore, ProductStore, RepositoryError};
use crate::models::{CartItem, CurrentUser};

/// Result of an add-to-cart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToCartOutcome {
    /// The line after the add.
    pub item: CartItem,
    pub product_name: String,
    /// Whether the line was created by this request.
    pub created: bool,
    /// Quantity added by this request.
    pub added: Quantity,
    /// Set when the requested quantity was replaced by one.
    pub warning: Option<QuantityWarning>,
}

impl AddToCartOutcome {
    /// Confirmation text for the user.
    #[must_use]
    pub fn message(&self) -> String {
        add_confirmation(&self.product_name, self.added, self.item.quantity, self.created)
    }
}

/// A user's cart with its computed total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    /// Sum of price times quantity over `lines`, from current prices.
    pub total: Decimal,
}

impl CartSummary {
    /// Whether the cart has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Cart service.
pub struct CartService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ProductStore + CartStore + ?Sized> CartService<'a, S> {
    /// Create a cart service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Add a product to the user's cart.
    ///
    /// `requested` is the raw quantity parameter. A missing value adds one; an
    /// unusable value also adds one and sets [`AddToCartOutcome::warning`].
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product doesn't exist.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn add(
        &self,
        user: &CurrentUser,
        product_id: ProductId,
        requested: Option<&str>,
    ) -> Result<AddToCartOutcome, ServiceError> {
        let (added, warning) = Quantity::parse_or_clamp(requested);
        if let Some(warning) = &warning {
            tracing::warn!(%warning, "clamped cart quantity");
        }

        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(ServiceError::NotFound("product"))?
            .product;

        let upsert = self
            .store
            .add_or_increment(user.id, product_id, added)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::NotFound("product"),
                other => ServiceError::System(other),
            })?;

        tracing::info!(
            cart_item_id = %upsert.item.id,
            quantity = %upsert.item.quantity,
            created = upsert.created,
            "cart updated"
        );

        Ok(AddToCartOutcome {
            item: upsert.item,
            product_name: product.name,
            created: upsert.created,
            added,
            warning,
        })
    }

    /// The user's cart lines and total.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::System` if the store fails.
    pub async fn view(&self, user: &CurrentUser) -> Result<CartSummary, ServiceError> {
        let lines = self.store.list_cart(user.id).await?;
        let total = order_total(&lines);
        Ok(CartSummary { lines, total })
    }

    /// Remove one of the user's cart lines.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the line doesn't exist or belongs to
    /// another user; the line is left untouched in that case.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn remove(&self, user: &CurrentUser, item_id: CartItemId) -> Result<(), ServiceError> {
        if !self.store.remove_cart_item(user.id, item_id).await? {
            return Err(ServiceError::NotFound("cart item"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use product_manager_core::forms::{ProductInput, SpecPlan};

    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::models::ProductRecord;

    async fn shopper(store: &MemoryStore, email: &str) -> CurrentUser {
        let email = product_manager_core::Email::parse(email).unwrap();
        let user = store.create_user(&email, "hash").await.unwrap();
        CurrentUser {
            id: user.id,
            email: user.email,
        }
    }

    async fn product(store: &MemoryStore, slug: &str, price: &str) -> ProductId {
        let draft = ProductInput {
            name: slug.to_uppercase(),
            slug: slug.to_owned(),
            description: "d".to_owned(),
            price: Some(price.to_owned()),
        }
        .validate()
        .unwrap();
        store
            .create_product(&ProductRecord { draft, image: None }, &SpecPlan::default())
            .await
            .unwrap()
            .product
            .id
    }

    #[tokio::test]
    async fn test_add_then_increment() {
        let store = MemoryStore::new();
        let user = shopper(&store, "a@example.com").await;
        let p = product(&store, "mouse", "10.00").await;
        let cart = CartService::new(&store);

        let first = cart.add(&user, p, Some("3")).await.unwrap();
        assert!(first.created);
        assert_eq!(first.message(), "Added 3 x MOUSE to cart!");

        let second = cart.add(&user, p, Some("2")).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.item.quantity.get(), 5);
        assert_eq!(second.message(), "Added 2 more MOUSE(s)! Total: 5");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_share_one_line() {
        const ADDS: i32 = 50;
        let store = Arc::new(MemoryStore::new());
        let user = shopper(&store, "a@example.com").await;
        let p = product(&store, "mouse", "10.00").await;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..ADDS {
            let store = Arc::clone(&store);
            let user = user.clone();
            tasks.spawn(async move {
                CartService::new(store.as_ref())
                    .add(&user, p, Some("1"))
                    .await
                    .map(|outcome| outcome.created)
            });
        }

        let mut created = 0;
        while let Some(joined) = tasks.join_next().await {
            if joined.unwrap().unwrap() {
                created += 1;
            }
        }

        let lines = store.list_cart(user.id).await.unwrap();
        assert_eq!(created, 1);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity.get(), ADDS);
        assert_eq!(store.cart_item_count().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_quantity_defaults_to_one() {
        let store = MemoryStore::new();
        let user = shopper(&store, "a@example.com").await;
        let p = product(&store, "mouse", "10.00").await;
        let cart = CartService::new(&store);

        let outcome = cart.add(&user, p, Some("abc")).await.unwrap();
        assert_eq!(outcome.item.quantity, Quantity::ONE);
        assert!(outcome.warning.is_some());

        let outcome = cart.add(&user, p, None).await.unwrap();
        assert_eq!(outcome.item.quantity.get(), 2);
        assert!(outcome.warning.is_none());
    }

    #[tokio::test]
    async fn test_add_missing_product() {
        let store = MemoryStore::new();
        let user = shopper(&store, "a@example.com").await;
        let cart = CartService::new(&store);

        assert!(matches!(
            cart.add(&user, ProductId::new(77), Some("1")).await,
            Err(ServiceError::NotFound("product"))
        ));
        assert_eq!(store.cart_item_count().await, 0);
    }

    #[tokio::test]
    async fn test_view_totals_current_prices() {
        let store = MemoryStore::new();
        let user = shopper(&store, "a@example.com").await;
        let a = product(&store, "a", "10.00").await;
        let b = product(&store, "b", "5.00").await;
        let cart = CartService::new(&store);

        cart.add(&user, a, Some("2")).await.unwrap();
        cart.add(&user, b, Some("3")).await.unwrap();

        let summary = cart.view(&user).await.unwrap();
        assert_eq!(summary.lines.len(), 2);
        assert_eq!(summary.total, Decimal::new(3500, 2));

        let other = shopper(&store, "b@example.com").await;
        assert!(cart.view(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_foreign_item_is_not_found() {
        let store = MemoryStore::new();
        let owner = shopper(&store, "a@example.com").await;
        let intruder = shopper(&store, "b@example.com").await;
        let p = product(&store, "mouse", "1").await;
        let cart = CartService::new(&store);
        let item = cart.add(&owner, p, Some("1")).await.unwrap().item;

        assert!(matches!(
            cart.remove(&intruder, item.id).await,
            Err(ServiceError::NotFound("cart item"))
        ));
        assert_eq!(cart.view(&owner).await.unwrap().lines.len(), 1);

        cart.remove(&owner, item.id).await.unwrap();
        assert!(cart.view(&owner).await.unwrap().is_empty());
    }
}
