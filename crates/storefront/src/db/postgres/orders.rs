//! Order queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use lumen_core::{OrderId, OrderStatus, UserId};

use super::{OrderItemRow, OrderRow, PgStore};
use crate::db::{OrderRepo, RepositoryError};
use crate::models::{Order, OrderFilter, OrderItem, OrderListing, StatusChange};

const ORDER_COLUMNS: &str =
    "o.id, o.user_id, o.address_id, o.total, o.status, o.status_changes, o.created_at, o.updated_at";

#[derive(sqlx::FromRow)]
struct OrderListingRow {
    #[sqlx(flatten)]
    order: OrderRow,
    full_name: String,
    phone: String,
}

#[async_trait]
impl OrderRepo for PgStore {
    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders o WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, variant_id, quantity, price, discounted_price
            FROM shop.order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    async fn orders_for_user(
        &self,
        user: UserId,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM shop.orders o
            WHERE o.user_id = $1 AND o.status = ANY($2)
            ORDER BY o.created_at DESC, o.id DESC
            "
        ))
        .bind(user)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
    ) -> Result<Vec<OrderListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderListingRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}, a.full_name, a.phone
            FROM shop.orders o
            JOIN shop.addresses a ON a.id = o.address_id
            WHERE ($1::text IS NULL OR o.status = $1)
              AND ($2::text IS NULL
                   OR o.id::text = $2
                   OR a.full_name ILIKE '%' || $2 || '%'
                   OR a.phone ILIKE '%' || $2 || '%')
            ORDER BY o.created_at DESC, o.id DESC
            "
        ))
        .bind(filter.status.map(OrderStatus::as_str))
        .bind(filter.search_term())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(OrderListing {
                    order: Order::try_from(r.order)?,
                    full_name: r.full_name,
                    phone: r.phone,
                })
            })
            .collect()
    }

    async fn transition_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let change = StatusChange { from, to, at };
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE shop.orders o
            SET status = $3,
                updated_at = $4,
                status_changes = o.status_changes || jsonb_build_array($5::jsonb)
            WHERE o.id = $1 AND o.status = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at)
        .bind(Json(change))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }
}
