//! Lumen Core - Shared domain types.
//!
//! This crate provides the types used across all Lumen components:
//! - `storefront` - Cart, checkout, orders, reviews and wishlist services
//! - `cli` - Command-line tools for migrations, seeding and order management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Pricing and the order status machine live here so they can
//! be tested without any infrastructure.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, owner keys, email, address fields, ratings, slugs
//! - [`pricing`] - Effective and original unit prices
//! - [`status`] - Order status state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod status;
pub mod types;

pub use pricing::Pricing;
pub use status::{OrderStatus, StatusError};
pub use types::*;
