//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Page, Product, ProductDetail, ProductFilter, Review};
use crate::services::{CatalogService, ReviewService};
use crate::state::AppState;

/// Review submission body.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

/// Product listing with filters, sorting and pagination.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Page<Product>>> {
    let page = CatalogService::new(state.store())
        .list_products(&filter)
        .await?;
    Ok(Json(page))
}

/// Product detail page data.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let detail = CatalogService::new(state.store())
        .product_detail(&slug)
        .await?;
    Ok(Json(detail))
}

/// Reviews of a product, newest first.
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Review>>> {
    let product = CatalogService::new(state.store())
        .product_by_slug(&slug)
        .await?;
    let reviews = ReviewService::new(state.store()).reviews(product.id).await?;
    Ok(Json(reviews))
}

/// Add the signed-in user's review.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn add_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(slug): Path<String>,
    Json(form): Json<ReviewForm>,
) -> Result<(StatusCode, Json<Review>)> {
    let product = CatalogService::new(state.store())
        .product_by_slug(&slug)
        .await?;
    let review = ReviewService::new(state.store())
        .add_review(user.id, product.id, form.rating, &form.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}
