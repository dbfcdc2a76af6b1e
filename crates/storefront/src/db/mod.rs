//! Record store for the storefront.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `user` - Site authentication
//! - `product` - Catalog entries, unique `slug`
//! - `specification` - Key/value rows owned by a product (`ON DELETE CASCADE`)
//! - `cart_item` - One row per (user, product), `quantity >= 1`
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p product-manager-cli -- migrate
//! ```
//!
//! # Backends
//!
//! The services talk to the [`Store`] trait. [`PgStore`] is the production
//! backend; [`MemoryStore`] keeps everything in process and backs the tests.

pub mod cart;
pub mod memory;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use product_manager_core::forms::SpecPlan;
use product_manager_core::{CartItemId, CartLine, Email, ProductId, Quantity, UserId};

use crate::models::{CartUpsert, Product, ProductRecord, ProductWithSpecs, User};

pub use cart::CartRepository;
pub use memory::MemoryStore;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation. Carries the name of the offending field.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A row referenced by a batch edit disappeared before it was applied.
    #[error("{table} row {id} no longer exists")]
    StaleRow {
        /// Table the row lived in.
        table: &'static str,
        /// The missing row id.
        id: i32,
    },
}

/// Map a unique violation to [`RepositoryError::Conflict`] naming `field`.
pub(crate) fn conflict_on_unique(field: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(field.to_owned());
        }
        RepositoryError::Database(e)
    }
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Duplicate emails are a [`RepositoryError::Conflict`].
    async fn create_user(&self, email: &Email, password_hash: &str)
    -> Result<User, RepositoryError>;

    /// Look up a user together with their password hash.
    async fn get_user_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Look up a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}

/// Products and their specification rows.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products, newest first.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// One product with its specifications.
    async fn get_product(&self, id: ProductId)
    -> Result<Option<ProductWithSpecs>, RepositoryError>;

    /// Insert a product and apply `specs` as one atomic unit.
    async fn create_product(
        &self,
        record: &ProductRecord,
        specs: &SpecPlan,
    ) -> Result<ProductWithSpecs, RepositoryError>;

    /// Overwrite a product and apply `specs` as one atomic unit.
    ///
    /// A missing product is [`RepositoryError::NotFound`]; an update or delete
    /// of a spec row that is no longer attached is [`RepositoryError::StaleRow`].
    async fn update_product(
        &self,
        id: ProductId,
        record: &ProductRecord,
        specs: &SpecPlan,
    ) -> Result<ProductWithSpecs, RepositoryError>;

    /// Delete a product, cascading to its specifications and cart items.
    /// Returns `false` when nothing was deleted.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Per-user carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Create the (user, product) line with `quantity`, or add `quantity` to
    /// the existing line, atomically.
    async fn add_or_increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartUpsert, RepositoryError>;

    /// The user's cart lines joined with current product data.
    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Delete a line owned by `user_id`. Returns `false` when no such line
    /// exists for that user.
    async fn remove_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError>;
}

/// Everything the application needs from its backend.
#[async_trait]
pub trait Store: UserStore + ProductStore + CartStore + 'static {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL` store backed by a connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool)
            .create_with_password(email, password_hash)
            .await
    }

    async fn get_user_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        UserRepository::new(&self.pool).get_password_hash(email).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_id(id).await
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).list().await
    }

    async fn get_product(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductWithSpecs>, RepositoryError> {
        ProductRepository::new(&self.pool).get_with_specs(id).await
    }

    async fn create_product(
        &self,
        record: &ProductRecord,
        specs: &SpecPlan,
    ) -> Result<ProductWithSpecs, RepositoryError> {
        ProductRepository::new(&self.pool).create(record, specs).await
    }

    async fn update_product(
        &self,
        id: ProductId,
        record: &ProductRecord,
        specs: &SpecPlan,
    ) -> Result<ProductWithSpecs, RepositoryError> {
        ProductRepository::new(&self.pool)
            .update(id, record, specs)
            .await
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        ProductRepository::new(&self.pool).delete(id).await
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn add_or_increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartUpsert, RepositoryError> {
        CartRepository::new(&self.pool)
            .add_or_increment(user_id, product_id, quantity)
            .await
    }

    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        CartRepository::new(&self.pool).lines_for_user(user_id).await
    }

    async fn remove_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        CartRepository::new(&self.pool).remove(user_id, item_id).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
