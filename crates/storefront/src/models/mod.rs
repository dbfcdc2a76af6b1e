//! Domain models for the storefront.
//!
//! These are the validated shapes that cross the store boundary; row types
//! used for decoding stay private to `db`.

pub mod cart;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartItem, CartUpsert};
pub use product::{Product, ProductRecord, ProductWithSpecs, Specification};
pub use session::{CurrentUser, FlashLevel, FlashMessage, keys as session_keys};
pub use user::User;
