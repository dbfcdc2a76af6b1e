//! Product Manager Core - domain types and rules.
//!
//! Shared by the storefront web application and the CLI:
//! - [`types`] - typed IDs, `Email`, `Price`, `Slug`, `Quantity`
//! - [`forms`] - product form and specification formset validation
//! - [`cart`] - cart line arithmetic and confirmation text
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. Storage and transport live in the storefront
//! crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod forms;
pub mod types;

pub use cart::{CartLine, add_confirmation, order_total};
pub use types::*;
