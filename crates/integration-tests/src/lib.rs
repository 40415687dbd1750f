//! Integration test fixtures for Lumen.
//!
//! Every test runs against [`MemoryStore`] and an in-memory session store, so
//! no database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lumen-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart` - Cart operations through the service layer
//! - `checkout` - Order placement, inventory and rollback
//! - `orders` - Status machine, confirmation access, account views
//! - `reviews_wishlist` - Reviews, ratings and wishlists
//! - `http_api` - The JSON API end to end via `tower::ServiceExt::oneshot`

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use rust_decimal::Decimal;
use tower_sessions::Session;

use lumen_core::{AddressFields, Email, SessionKey, UserId};
use lumen_storefront::db::{CatalogRepo, MemoryStore};
use lumen_storefront::middleware::session::SESSION_COOKIE_NAME;
use lumen_storefront::middleware::{create_session_layer, set_current_user};
use lumen_storefront::models::{
    Category, CurrentUser, NewCategory, NewProduct, NewVariant, Product, ProductVariant,
};
use lumen_storefront::services::{CatalogService, RequestContext};
use lumen_storefront::state::AppState;

/// A small catalog.
///
/// - `lamp`: price 100.00, discounted to 80.00, stock 10, with a variant
///   adding 15.00 (stock 3)
/// - `bulb`: price 25.00, no discount, stock 5
pub struct Fixture {
    pub store: MemoryStore,
    pub category: Category,
    pub lamp: Product,
    pub lamp_variant: ProductVariant,
    pub bulb: Product,
}

pub async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let catalog = CatalogService::new(&store);

    let category = catalog
        .create_category(&NewCategory {
            name: "Lamps".into(),
            slug: None,
            description: String::new(),
        })
        .await
        .unwrap();

    let lamp = catalog
        .create_product(&product(&category, "Arc Lamp", 100, Some(80), 10))
        .await
        .unwrap();
    let lamp_variant = catalog
        .create_variant(&NewVariant {
            product_id: lamp.id,
            wattage: Some(60),
            color: Some("Brass".into()),
            shape: None,
            size: None,
            additional_price: Some(Decimal::new(15, 0)),
            stock: 3,
        })
        .await
        .unwrap();
    let bulb = catalog
        .create_product(&product(&category, "Globe Bulb", 25, None, 5))
        .await
        .unwrap();

    Fixture {
        store,
        category,
        lamp,
        lamp_variant,
        bulb,
    }
}

/// Product input with whole-unit prices.
#[must_use]
pub fn product(
    category: &Category,
    name: &str,
    price: i64,
    discount: Option<i64>,
    stock: i32,
) -> NewProduct {
    NewProduct {
        category_id: category.id,
        brand_id: None,
        name: name.into(),
        slug: None,
        description: String::new(),
        price: Decimal::new(price, 0),
        discount_price: discount.map(|d| Decimal::new(d, 0)),
        stock,
        available: true,
        featured: false,
        tag_ids: Vec::new(),
    }
}

impl Fixture {
    /// Re-read a product.
    pub async fn product(&self, product: &Product) -> Product {
        self.store.product(product.id).await.unwrap().unwrap()
    }

    /// Re-read a variant.
    pub async fn variant(&self, variant: &ProductVariant) -> ProductVariant {
        self.store.variant(variant.id).await.unwrap().unwrap()
    }
}

#[must_use]
pub fn user(id: i32) -> CurrentUser {
    CurrentUser {
        id: UserId::new(id),
        email: Email::parse(&format!("user{id}@example.com")).unwrap(),
        is_staff: false,
    }
}

#[must_use]
pub fn staff(id: i32) -> CurrentUser {
    CurrentUser {
        is_staff: true,
        ..user(id)
    }
}

#[must_use]
pub fn guest_ctx(key: &str) -> RequestContext {
    RequestContext::for_guest(SessionKey::new(key).unwrap())
}

#[must_use]
pub fn user_ctx(id: i32) -> RequestContext {
    RequestContext::for_user(user(id))
}

/// A complete delivery address.
#[must_use]
pub fn address(full_name: &str) -> AddressFields {
    AddressFields {
        full_name: Some(full_name.into()),
        email: Some("ada@example.com".into()),
        street: Some("12 Filament Way".into()),
        city: Some("Leeds".into()),
        state: Some("West Yorkshire".into()),
        postal_code: Some("LS1 4AP".into()),
        country: Some("GB".into()),
        phone: Some("+441134960000".into()),
    }
}

/// A standalone session over an in-memory session store.
#[must_use]
pub fn session() -> Session {
    Session::new(
        None,
        Arc::new(tower_sessions::MemoryStore::default()),
        None,
    )
}

// =============================================================================
// HTTP
// =============================================================================

/// The storefront router over `store`, without rate limits.
pub fn app(store: &MemoryStore, sessions: &tower_sessions::MemoryStore) -> Router {
    let state = AppState::new(Arc::new(store.clone()));
    lumen_storefront::app(state, create_session_layer(sessions.clone(), false), None)
}

/// A session cookie for `user`, as if the sign-in flow had run.
pub async fn signed_in_cookie(sessions: &tower_sessions::MemoryStore, user: &CurrentUser) -> String {
    let session = Session::new(None, Arc::new(sessions.clone()), None);
    set_current_user(&session, user).await.unwrap();
    session.save().await.unwrap();
    format!("{SESSION_COOKIE_NAME}={}", session.id().unwrap())
}

/// The session cookie a response sets, ready to send back.
#[must_use]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE_NAME))
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

/// A JSON request, optionally carrying a cookie.
#[must_use]
pub fn json_request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// A bodyless request, optionally carrying a cookie.
#[must_use]
pub fn request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Read a response body as JSON.
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
