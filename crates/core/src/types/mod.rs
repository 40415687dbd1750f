//! Core types for Lumen.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod owner;
pub mod rating;
pub mod slug;

pub use address::{AddressError, AddressFields, ValidAddress};
pub use email::{Email, EmailError};
pub use id::*;
pub use owner::{OwnerKey, SessionKey};
pub use rating::{Rating, RatingError};
pub use slug::slugify;
