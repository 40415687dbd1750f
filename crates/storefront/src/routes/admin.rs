//! Admin order management handlers.
//!
//! These routes require a staff user.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use lumen_core::OrderId;

use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::{Order, OrderFilter, OrderListing};
use crate::services::OrderService;
use crate::state::AppState;

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// All orders, newest first, filtered by status and search term.
#[instrument(skip(state, staff), fields(staff_id = %staff.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<OrderListing>>> {
    let orders = OrderService::new(state.store())
        .list_orders(&filter)
        .await?;
    Ok(Json(orders))
}

/// Move an order along the status machine.
#[instrument(skip(state, staff), fields(staff_id = %staff.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<OrderId>,
    Json(form): Json<StatusForm>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.store())
        .update_order_status(id, &form.status)
        .await?;
    tracing::info!(order_id = %id, status = %order.status, "Order status updated by staff");
    Ok(Json(order))
}

#[instrument(skip(state, staff), fields(staff_id = %staff.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.store()).cancel_order(id).await?;
    Ok(Json(order))
}
