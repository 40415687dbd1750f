//! Session-related types.
//!
//! Types stored in the session for identity, guest carts and guest wishlists.

use serde::{Deserialize, Serialize};

use lumen_core::{Email, UserId};

/// Session-stored user identity.
///
/// Written by the external sign-in flow; the storefront only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's ID in the identity provider.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Staff may manage orders.
    #[serde(default)]
    pub is_staff: bool,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the guest owner key used by carts.
    pub const GUEST_KEY: &str = "guest_key";

    /// Key for the last order placed by a guest in this session.
    pub const GUEST_ORDER_ID: &str = "guest_order_id";

    /// Key for the guest wishlist (list of product ids).
    pub const WISHLIST: &str = "wishlist";
}
