//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Email and password accounts
//! - `catalog` - Product CRUD with specification formsets
//! - `cart` - Per-user cart add, view and remove
//! - `media` - Uploaded product images
//!
//! Services borrow a store through its trait, so handlers pass the shared
//! `dyn Store` and tests pass a [`crate::db::MemoryStore`] directly.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod media;

pub use auth::{AuthError, AuthService};
pub use cart::{AddToCartOutcome, CartService, CartSummary};
pub use catalog::CatalogService;
pub use media::{ImageUpload, MediaStorage};

use product_manager_core::forms::FormErrors;

use crate::db::RepositoryError;

/// Errors returned by the catalog and cart services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The submission failed validation; carries every field error.
    #[error("validation failed: {0}")]
    ValidationFailed(FormErrors),

    /// The named entity does not exist, or is not visible to the requester.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unexpected store failure. Any open transaction was rolled back.
    #[error("system error: {0}")]
    System(#[from] RepositoryError),

    /// Writing or removing an uploaded file failed.
    #[error("media storage error: {0}")]
    Media(#[from] std::io::Error),
}
