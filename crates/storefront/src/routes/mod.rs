//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                liveness
//! GET    /health/ready                          store connectivity
//!
//! # Catalog
//! GET    /api/products                          product listing
//! GET    /api/products/{slug}                   product detail
//! GET    /api/products/{slug}/reviews           reviews
//! POST   /api/products/{slug}/reviews           add review (auth, strict limit)
//!
//! # Cart
//! GET    /api/cart                              cart view
//! POST   /api/cart/add/{product_id}             add to cart
//! POST   /api/cart/update/{product_id}/{action} increase / decrease / remove
//! DELETE /api/cart/items/{item_id}              remove line
//! GET    /api/cart/count                        item count badge
//!
//! # Checkout
//! POST   /api/checkout                          place order (strict limit)
//! GET    /api/orders/{id}/confirmation          order confirmation
//!
//! # Account (requires auth)
//! GET    /api/account/orders                    active orders and history
//! GET    /api/account/orders/{id}               order detail
//! GET    /api/account/addresses                 address book
//! POST   /api/account/addresses                 add address
//! POST   /api/account/addresses/{id}            edit address
//!
//! # Wishlist
//! GET    /api/wishlist                          product ids
//! POST   /api/wishlist/{product_id}/toggle      toggle
//! DELETE /api/wishlist/{product_id}             remove
//!
//! # Admin (requires staff)
//! GET    /api/admin/orders                      order list
//! POST   /api/admin/orders/{id}/status          status change
//! POST   /api/admin/orders/{id}/cancel          cancel
//! ```

pub mod account;
pub mod admin;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    routing::{MethodRouter, delete, get, post},
};

use crate::middleware::RateLimits;
use crate::middleware::rate_limit::RateLimiterLayer;
use crate::state::AppState;

/// Wrap a route in the strict limiter when one is configured.
fn limited(
    route: MethodRouter<AppState>,
    limiter: Option<&RateLimiterLayer>,
) -> MethodRouter<AppState> {
    match limiter {
        Some(layer) => route.layer(layer.clone()),
        None => route,
    }
}

/// Create the product routes router.
pub fn product_routes(strict: Option<&RateLimiterLayer>) -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
        .route(
            "/{slug}/reviews",
            get(products::reviews).merge(limited(post(products::add_review), strict)),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{product_id}", post(cart::add))
        .route("/update/{product_id}/{action}", post(cart::update))
        .route("/items/{item_id}", delete(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order_detail))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/{id}", post(account::update_address))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/{product_id}/toggle", post(wishlist::toggle))
        .route("/{product_id}", delete(wishlist::remove))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", post(admin::update_status))
        .route("/orders/{id}/cancel", post(admin::cancel))
}

/// Create all routes for the storefront.
///
/// With `limits`, order placement and review submission get the strict
/// limiter and the rest of `/api` the relaxed one. Rate limiting keys on
/// proxy headers, so callers without them (tests) pass `None`.
pub fn routes(limits: Option<RateLimits>) -> Router<AppState> {
    let strict = limits.as_ref().map(|l| &l.checkout);

    let api = Router::new()
        .nest("/products", product_routes(strict))
        .nest("/cart", cart_routes())
        .route("/checkout", limited(post(checkout::place_order), strict))
        .route("/orders/{id}/confirmation", get(orders::confirmation))
        .nest("/account", account_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/admin", admin_routes());

    let api = match limits {
        Some(limits) => api.layer(limits.api),
        None => api,
    };

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
}
