//! Product Manager Storefront library.
//!
//! Catalog management with specification formsets and a per-user shopping
//! cart, served as server-rendered pages. The library holds everything
//! except process setup so the router can be driven from tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
