//! Wishlist types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use lumen_core::{ProductId, UserId, WishlistItemId};

/// A persisted wishlist entry for an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Higher sorts first.
    pub priority: i16,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}
