//! Order confirmation handler.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use lumen_core::OrderId;

use crate::error::Result;
use crate::middleware::Caller;
use crate::models::OrderDetail;
use crate::services::OrderService;
use crate::state::AppState;

/// Confirmation for an order the caller placed.
///
/// Guests can only see the order their session was linked to at checkout.
#[instrument(skip(state, caller))]
pub async fn confirmation(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let detail = OrderService::new(state.store())
        .confirmation(&caller.ctx, &caller.session, id)
        .await?;
    Ok(Json(detail))
}
