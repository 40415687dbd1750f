//! Wishlist route handlers.
//!
//! Guests and signed-in users share these routes; the backing list is picked
//! per request.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use lumen_core::ProductId;

use crate::error::Result;
use crate::middleware::Caller;
use crate::services::wishlist_for;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub product_ids: Vec<ProductId>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub product_id: ProductId,
    pub in_wishlist: bool,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub removed: bool,
    pub count: usize,
}

/// Product ids on the caller's wishlist.
pub async fn show(State(state): State<AppState>, caller: Caller) -> Result<Json<WishlistResponse>> {
    let wishlist = wishlist_for(state.store(), &caller.session, &caller.ctx);
    let product_ids: Vec<ProductId> = wishlist.ids().await?.into_iter().collect();
    Ok(Json(WishlistResponse {
        count: product_ids.len(),
        product_ids,
    }))
}

/// Add the product if absent, remove it if present.
#[instrument(skip(state, caller))]
pub async fn toggle(
    State(state): State<AppState>,
    caller: Caller,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ToggleResponse>> {
    let wishlist = wishlist_for(state.store(), &caller.session, &caller.ctx);
    let in_wishlist = wishlist.toggle(product_id).await?;
    let count = wishlist.count().await?;
    Ok(Json(ToggleResponse {
        product_id,
        in_wishlist,
        count,
    }))
}

/// Remove the product; removing an absent product is not an error.
#[instrument(skip(state, caller))]
pub async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(product_id): Path<ProductId>,
) -> Result<Json<RemoveResponse>> {
    let wishlist = wishlist_for(state.store(), &caller.session, &caller.ctx);
    let removed = wishlist.remove(product_id).await?;
    let count = wishlist.count().await?;
    Ok(Json(RemoveResponse { removed, count }))
}
