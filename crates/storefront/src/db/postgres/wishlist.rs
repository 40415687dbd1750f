//! Wishlist queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lumen_core::{ProductId, UserId, WishlistItemId};

use super::PgStore;
use crate::db::{RepositoryError, WishlistRepo};
use crate::models::WishlistItem;

#[derive(sqlx::FromRow)]
struct WishlistItemRow {
    id: WishlistItemId,
    user_id: UserId,
    product_id: ProductId,
    priority: i16,
    notes: Option<String>,
    added_at: DateTime<Utc>,
}

impl From<WishlistItemRow> for WishlistItem {
    fn from(r: WishlistItemRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            product_id: r.product_id,
            priority: r.priority,
            notes: r.notes,
            added_at: r.added_at,
        }
    }
}

#[async_trait]
impl WishlistRepo for PgStore {
    async fn wishlist_items(&self, user: UserId) -> Result<Vec<WishlistItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistItemRow>(
            r"
            SELECT id, user_id, product_id, priority, notes, added_at
            FROM shop.wishlist_items
            WHERE user_id = $1
            ORDER BY priority DESC, added_at, id
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(WishlistItem::from).collect())
    }

    async fn add_wishlist_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO shop.wishlist_items (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT wishlist_items_user_product_key DO NOTHING
            ",
        )
        .bind(user)
        .bind(product)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_wishlist_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM shop.wishlist_items WHERE user_id = $1 AND product_id = $2")
                .bind(user)
                .bind(product)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
