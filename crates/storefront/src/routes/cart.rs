//! Cart route handlers.
//!
//! Reads never mint a guest key: a visitor without one simply has an empty
//! cart. Writes resolve the caller through [`Caller`], which creates the key
//! on first use.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use lumen_core::{CartItemId, OwnerKey, ProductId, VariantId};

use crate::error::{AppError, Result};
use crate::middleware::Caller;
use crate::models::{CartAction, CartItem, CartUpdate, CartView};
use crate::services::{CartService, SessionState};
use crate::state::AppState;

/// Add-to-cart body.
#[derive(Debug, Default, Deserialize)]
pub struct AddToCartForm {
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    /// Defaults to 1.
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Update body; selects the variant line to change.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCartForm {
    #[serde(default)]
    pub variant_id: Option<VariantId>,
}

#[derive(Debug, Serialize)]
pub struct AddToCartResponse {
    pub item: CartItem,
    pub cart_count: u32,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u32,
}

/// The owner the session already identifies, without creating one.
async fn existing_owner(session: &Session) -> Result<Option<OwnerKey>> {
    if let Some(user) = session.current_user().await? {
        return Ok(Some(OwnerKey::User(user.id)));
    }
    Ok(session.session_key(false).await?.map(OwnerKey::Session))
}

/// Display the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let view = match existing_owner(&session).await? {
        Some(owner) => CartService::new(state.store()).view(&owner).await?,
        None => CartView::empty(),
    };
    Ok(Json(view))
}

/// Add a product (or one of its variants) to the cart.
#[instrument(skip(state, caller, form), fields(owner = %caller.ctx.owner))]
pub async fn add(
    State(state): State<AppState>,
    caller: Caller,
    Path(product_id): Path<ProductId>,
    Json(form): Json<AddToCartForm>,
) -> Result<Json<AddToCartResponse>> {
    let service = CartService::new(state.store());
    let owner = &caller.ctx.owner;
    let item = service
        .add_item(owner, product_id, form.variant_id, form.quantity.unwrap_or(1))
        .await?;
    let cart_count = service.count(owner).await?;
    Ok(Json(AddToCartResponse { item, cart_count }))
}

/// Increase, decrease or remove a cart line.
#[instrument(skip(state, caller, form), fields(owner = %caller.ctx.owner))]
pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path((product_id, action)): Path<(ProductId, String)>,
    Json(form): Json<UpdateCartForm>,
) -> Result<Json<CartUpdate>> {
    let action = action
        .parse::<CartAction>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let update = CartService::new(state.store())
        .update_item(&caller.ctx.owner, product_id, form.variant_id, action)
        .await?;
    Ok(Json(update))
}

/// Remove a line by id.
#[instrument(skip(state, caller), fields(owner = %caller.ctx.owner))]
pub async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<RemoveResponse>> {
    let total = CartService::new(state.store())
        .remove_item(&caller.ctx.owner, item_id)
        .await?;
    Ok(Json(RemoveResponse { total }))
}

/// Cart count for the header badge.
pub async fn count(State(state): State<AppState>, session: Session) -> Result<Json<CountResponse>> {
    let count = match existing_owner(&session).await? {
        Some(owner) => CartService::new(state.store()).count(&owner).await?,
        None => 0,
    };
    Ok(Json(CountResponse { count }))
}
