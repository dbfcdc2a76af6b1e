//! Value types for the catalog and cart.
//!
//! Each type validates on construction, so holding one means the value is
//! already acceptable for storage.

pub mod email;
pub mod id;
pub mod price;
pub mod quantity;
pub mod slug;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityWarning};
pub use slug::{Slug, SlugError};
