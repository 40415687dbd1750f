//! Cart queries.
//!
//! Every mutation is one statement, so concurrent requests against the same
//! cart cannot lose an increment.

use async_trait::async_trait;

use lumen_core::{CartId, CartItemId, OwnerKey, ProductId, SessionKey, VariantId};

use super::{CartItemRow, CartRow, PgStore, load_cart_lines};
use crate::db::{CartRepo, RepositoryError, quantity_to_i32};
use crate::models::{Cart, CartAction, CartItem, CartItemChange, CartLine, MAX_LINE_QUANTITY};

const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, variant_id, quantity, added_at";

#[async_trait]
impl CartRepo for PgStore {
    async fn get_or_create_cart(&self, owner: &OwnerKey) -> Result<Cart, RepositoryError> {
        let user = owner.user_id();
        let key = owner.session_key().map(SessionKey::as_str);

        // The partial unique indexes make this a no-op for an existing owner.
        sqlx::query(
            r"
            INSERT INTO shop.carts (user_id, session_key)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user)
        .bind(key)
        .execute(&self.pool)
        .await?;

        self.find_cart(owner).await?.ok_or(RepositoryError::NotFound)
    }

    async fn find_cart(&self, owner: &OwnerKey) -> Result<Option<Cart>, RepositoryError> {
        let row = match owner {
            OwnerKey::User(user) => {
                sqlx::query_as::<_, CartRow>(
                    "SELECT id, user_id, session_key, created_at FROM shop.carts WHERE user_id = $1",
                )
                .bind(*user)
                .fetch_optional(&self.pool)
                .await?
            }
            OwnerKey::Session(key) => {
                sqlx::query_as::<_, CartRow>(
                    "SELECT id, user_id, session_key, created_at FROM shop.carts WHERE session_key = $1",
                )
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.map(Cart::try_from).transpose()
    }

    async fn cart_lines(&self, cart: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_cart_lines(&mut conn, cart, false).await
    }

    async fn add_cart_item(
        &self,
        cart: CartId,
        product: ProductId,
        variant: Option<VariantId>,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            INSERT INTO shop.cart_items (cart_id, product_id, variant_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT cart_items_line_key
            DO UPDATE SET quantity = LEAST(shop.cart_items.quantity + EXCLUDED.quantity, $5)
            RETURNING {CART_ITEM_COLUMNS}
            "
        ))
        .bind(cart)
        .bind(product)
        .bind(variant)
        .bind(quantity_to_i32(quantity.min(MAX_LINE_QUANTITY))?)
        .bind(quantity_to_i32(MAX_LINE_QUANTITY)?)
        .fetch_one(&self.pool)
        .await?;

        CartItem::try_from(row)
    }

    async fn apply_cart_action(
        &self,
        cart: CartId,
        product: ProductId,
        variant: Option<VariantId>,
        action: CartAction,
    ) -> Result<Option<CartItemChange>, RepositoryError> {
        const LINE: &str =
            "cart_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3";

        match action {
            CartAction::Increase => {
                let row = sqlx::query_as::<_, CartItemRow>(&format!(
                    "UPDATE shop.cart_items SET quantity = LEAST(quantity + 1, $4) WHERE {LINE} \
                     RETURNING {CART_ITEM_COLUMNS}"
                ))
                .bind(cart)
                .bind(product)
                .bind(variant)
                .bind(quantity_to_i32(MAX_LINE_QUANTITY)?)
                .fetch_optional(&self.pool)
                .await?;
                row.map(|r| CartItem::try_from(r).map(CartItemChange::Updated))
                    .transpose()
            }
            CartAction::Decrease => {
                let mut tx = self.pool.begin().await?;
                let row = sqlx::query_as::<_, CartItemRow>(&format!(
                    "UPDATE shop.cart_items SET quantity = quantity - 1 \
                     WHERE {LINE} AND quantity > 1 RETURNING {CART_ITEM_COLUMNS}"
                ))
                .bind(cart)
                .bind(product)
                .bind(variant)
                .fetch_optional(&mut *tx)
                .await?;

                let change = if let Some(row) = row {
                    Some(CartItemChange::Updated(CartItem::try_from(row)?))
                } else {
                    // Quantity was 1 (or the line is absent): delete instead.
                    let deleted = sqlx::query(&format!("DELETE FROM shop.cart_items WHERE {LINE}"))
                        .bind(cart)
                        .bind(product)
                        .bind(variant)
                        .execute(&mut *tx)
                        .await?;
                    (deleted.rows_affected() > 0).then_some(CartItemChange::Removed)
                };

                tx.commit().await?;
                Ok(change)
            }
            CartAction::Remove => {
                let deleted = sqlx::query(&format!("DELETE FROM shop.cart_items WHERE {LINE}"))
                    .bind(cart)
                    .bind(product)
                    .bind(variant)
                    .execute(&self.pool)
                    .await?;
                Ok((deleted.rows_affected() > 0).then_some(CartItemChange::Removed))
            }
        }
    }

    async fn remove_cart_item(
        &self,
        cart: CartId,
        item: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM shop.cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item)
            .bind(cart)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }
}
