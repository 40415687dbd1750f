//! Order reads and status management.

use chrono::Utc;
use tracing::instrument;

use lumen_core::{OrderId, OrderStatus, UserId};

use crate::db::Store;
use crate::error::ShopError;
use crate::models::{AccountOrders, Order, OrderDetail, OrderFilter, OrderListing};

use super::identity::{RequestContext, SessionState};

/// Statuses shown as "active" on the account page.
const ACTIVE_STATUSES: [OrderStatus; 3] = [
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::OutForDelivery,
];

/// Order lifecycle operations.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Move an order to a new status.
    ///
    /// The write is a compare-and-set on the status read here, so two admins
    /// racing on the same order cannot skip a step of the machine.
    ///
    /// # Errors
    ///
    /// - `ShopError::InvalidStatus` for an unknown status, a transition the
    ///   machine does not allow, or a lost race
    /// - `ShopError::NotFound` if the order does not exist
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        new_status: &str,
    ) -> Result<Order, ShopError> {
        let next: OrderStatus = new_status.parse()?;
        self.transition(order_id, next).await
    }

    /// Cancel an order that has not been delivered.
    ///
    /// # Errors
    ///
    /// Same as [`Self::update_order_status`].
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order, ShopError> {
        self.transition(order_id, OrderStatus::Cancelled).await
    }

    async fn transition(&self, order_id: OrderId, next: OrderStatus) -> Result<Order, ShopError> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(ShopError::NotFound("Order"))?;
        let current = order.status;
        current.transition(next)?;

        let updated = self
            .store
            .transition_order_status(order_id, current, next, Utc::now())
            .await?;

        match updated {
            Some(order) => {
                tracing::info!(
                    order_id = %order_id,
                    from = %current,
                    to = %next,
                    "Order status updated"
                );
                Ok(order)
            }
            None => {
                // Someone else moved the order between our read and write.
                let now = self
                    .store
                    .order(order_id)
                    .await?
                    .ok_or(ShopError::NotFound("Order"))?;
                tracing::warn!(
                    order_id = %order_id,
                    expected = %current,
                    found = %now.status,
                    "Concurrent status update"
                );
                Err(ShopError::InvalidStatus(format!(
                    "order is now {}, cannot move to {}",
                    now.status, next
                )))
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Order confirmation for the caller.
    ///
    /// Signed-in users see only their own orders. Guests see only the order
    /// linked to their session at checkout.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the order does not exist or is not the
    /// caller's.
    #[instrument(skip(self, ctx, session))]
    pub async fn confirmation(
        &self,
        ctx: &RequestContext,
        session: &dyn SessionState,
        order_id: OrderId,
    ) -> Result<OrderDetail, ShopError> {
        let allowed = match ctx.user_id() {
            Some(_) => true,
            None => session
                .guest_order()
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Failed to read guest order link"))
                .ok()
                .flatten()
                == Some(order_id),
        };
        if !allowed {
            return Err(ShopError::NotFound("Order"));
        }

        let detail = self.detail(order_id).await?;
        if detail.order.user_id != ctx.user_id() {
            return Err(ShopError::NotFound("Order"));
        }
        Ok(detail)
    }

    /// One of the user's orders with its address and lines.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` unless the order belongs to `user`.
    #[instrument(skip(self))]
    pub async fn order_detail(
        &self,
        user: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetail, ShopError> {
        let detail = self.detail(order_id).await?;
        if detail.order.user_id != Some(user) {
            return Err(ShopError::NotFound("Order"));
        }
        Ok(detail)
    }

    /// Delivered orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn order_history(&self, user: UserId) -> Result<Vec<Order>, ShopError> {
        Ok(self
            .store
            .orders_for_user(user, &[OrderStatus::Delivered])
            .await?)
    }

    /// Orders still in progress, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn active_orders(&self, user: UserId) -> Result<Vec<Order>, ShopError> {
        Ok(self.store.orders_for_user(user, &ACTIVE_STATUSES).await?)
    }

    /// Active orders and history together, for the account page.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn account_orders(&self, user: UserId) -> Result<AccountOrders, ShopError> {
        Ok(AccountOrders {
            active: self.active_orders(user).await?,
            history: self.order_history(user).await?,
        })
    }

    /// Admin order list, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderListing>, ShopError> {
        Ok(self.store.list_orders(filter).await?)
    }

    async fn detail(&self, order_id: OrderId) -> Result<OrderDetail, ShopError> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(ShopError::NotFound("Order"))?;
        let address = self
            .store
            .address(order.address_id)
            .await?
            .ok_or(ShopError::NotFound("Address"))?;
        let items = self.store.order_items(order_id).await?;
        Ok(OrderDetail {
            order,
            address,
            items,
        })
    }
}
