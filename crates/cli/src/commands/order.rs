//! Order management commands.

use tracing::info;

use lumen_core::{OrderId, OrderStatus};
use lumen_storefront::db::PgStore;
use lumen_storefront::models::OrderFilter;
use lumen_storefront::services::OrderService;

/// Change an order's status.
///
/// # Errors
///
/// Returns an error if the order does not exist or the transition is not
/// allowed from its current status.
pub async fn set_status(id: i32, status: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgStore::new(super::connect().await?);
    let order = OrderService::new(&store)
        .update_order_status(OrderId::new(id), status)
        .await?;
    info!(order_id = %order.id, status = %order.status, "Order status updated");
    Ok(())
}

/// List orders, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list(
    status: Option<OrderStatus>,
    search: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgStore::new(super::connect().await?);
    let filter = OrderFilter { status, search };
    let orders = OrderService::new(&store).list_orders(&filter).await?;

    info!("Orders ({})", orders.len());
    for listing in &orders {
        let order = &listing.order;
        info!(
            "  #{} {} {} {} ({}) {}",
            order.id,
            order.status,
            order.total,
            listing.full_name,
            listing.phone,
            order.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}
