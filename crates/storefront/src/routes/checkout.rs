//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use lumen_core::AddressFields;

use crate::error::Result;
use crate::middleware::Caller;
use crate::models::Order;
use crate::services::CheckoutService;
use crate::state::AppState;

/// Checkout body: the delivery address plus whether to keep it.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(flatten)]
    pub address: AddressFields,
    /// Store the address in a signed-in user's address book.
    #[serde(default)]
    pub save_address: bool,
}

/// Place an order from the caller's cart.
#[instrument(skip(state, caller, form), fields(owner = %caller.ctx.owner))]
pub async fn place_order(
    State(state): State<AppState>,
    caller: Caller,
    Json(form): Json<CheckoutForm>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = CheckoutService::new(state.store())
        .place_order(&caller.ctx, &caller.session, &form.address, form.save_address)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}
