//! Account route handlers.
//!
//! These routes require authentication.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use lumen_core::{AddressFields, AddressId, OrderId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{AccountOrders, Address, OrderDetail};
use crate::services::{AddressService, OrderService};
use crate::state::AppState;

/// Address book body.
#[derive(Debug, Deserialize)]
pub struct AddressForm {
    #[serde(flatten)]
    pub address: AddressFields,
    #[serde(default)]
    pub is_default: bool,
}

/// Active orders and delivered history.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<AccountOrders>> {
    let orders = OrderService::new(state.store())
        .account_orders(user.id)
        .await?;
    Ok(Json(orders))
}

/// One of the user's orders.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn order_detail(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let detail = OrderService::new(state.store())
        .order_detail(user.id, id)
        .await?;
    Ok(Json(detail))
}

pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressService::new(state.store())
        .list_addresses(user.id)
        .await?;
    Ok(Json(addresses))
}

/// Add an address to the book.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<AddressForm>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = AddressService::new(state.store())
        .save_address(&user, &form.address, form.is_default)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// Edit an address. Returns the stored address, which has a new id when the
/// original was already used by an order.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(form): Json<AddressForm>,
) -> Result<Json<Address>> {
    let address = AddressService::new(state.store())
        .update_address(&user, id, &form.address, form.is_default)
        .await?;
    Ok(Json(address))
}
