//! End-to-end tests of the JSON API.
//!
//! Requests go through the full router (sessions, security headers, request
//! id, tracing) with `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tower::ServiceExt;

use lumen_integration_tests::{
    Fixture, app, fixture, json_body, json_request, request, session_cookie, signed_in_cookie,
    staff, user,
};

struct Harness {
    fx: Fixture,
    sessions: tower_sessions::MemoryStore,
    app: Router,
}

async fn harness() -> Harness {
    let fx = fixture().await;
    let sessions = tower_sessions::MemoryStore::default();
    let app = app(&fx.store, &sessions);
    Harness { fx, sessions, app }
}

fn checkout_body() -> Value {
    json!({
        "full_name": "Ada Lovelace",
        "email": "ada@example.com",
        "street": "12 Filament Way",
        "city": "Leeds",
        "state": "West Yorkshire",
        "postal_code": "LS1 4AP",
        "country": "GB",
        "phone": "+441134960000",
    })
}

// =============================================================================
// Health and headers
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let h = harness().await;

    let live = h.app.clone().oneshot(request("GET", "/health", None)).await.unwrap();
    assert_eq!(live.status(), StatusCode::OK);

    let ready = h
        .app
        .clone()
        .oneshot(request("GET", "/health/ready", None))
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let h = harness().await;
    let mut req = request("GET", "/api/products", None);
    req.headers_mut()
        .insert("x-request-id", "trace-me-123".parse().unwrap());

    let response = h.app.clone().oneshot(req).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "trace-me-123");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["cache-control"], "no-store");
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_product_listing_and_detail() {
    let h = harness().await;

    let list = h
        .app
        .clone()
        .oneshot(request("GET", "/api/products?sort=price_low_to_high", None))
        .await
        .unwrap();
    assert_eq!(list.status(), StatusCode::OK);
    let body = json_body(list).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["slug"], "globe-bulb");
    assert_eq!(body["has_next"], false);

    let detail = h
        .app
        .clone()
        .oneshot(request("GET", "/api/products/arc-lamp", None))
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::OK);
    let body = json_body(detail).await;
    assert_eq!(body["slug"], "arc-lamp");
    assert_eq!(body["discount_percentage"], 20);
    assert_eq!(body["variants"].as_array().unwrap().len(), 1);
    assert_eq!(body["rating"]["count"], 0);

    let missing = h
        .app
        .clone()
        .oneshot(request("GET", "/api/products/no-such-lamp", None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inverted_price_range_rejected() {
    let h = harness().await;
    let response = h
        .app
        .clone()
        .oneshot(request(
            "GET",
            "/api/products?price_min=50&price_max=10",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["fields"], json!(["price_min"]));
}

// =============================================================================
// Guest cart and checkout
// =============================================================================

#[tokio::test]
async fn test_guest_cart_round_trip() {
    let h = harness().await;
    let bulb = h.fx.bulb.id;

    let empty = h
        .app
        .clone()
        .oneshot(request("GET", "/api/cart/count", None))
        .await
        .unwrap();
    assert!(session_cookie(&empty).is_none());
    assert_eq!(json_body(empty).await["count"], 0);

    let added = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/cart/add/{bulb}"),
            None,
            &json!({ "quantity": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(added.status(), StatusCode::OK);
    let cookie = session_cookie(&added).unwrap();
    assert_eq!(json_body(added).await["cart_count"], 2);

    let increased = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/cart/update/{bulb}/increase"),
            Some(&cookie),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(increased.status(), StatusCode::OK);
    assert_eq!(json_body(increased).await["quantity"], 3);

    let cart = h
        .app
        .clone()
        .oneshot(request("GET", "/api/cart", Some(&cookie)))
        .await
        .unwrap();
    let body = json_body(cart).await;
    assert_eq!(body["item_count"], 3);
    let item_id = body["lines"][0]["item_id"].as_i64().unwrap();

    let removed = h
        .app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/cart/items/{item_id}"),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(removed.status(), StatusCode::OK);

    let count = h
        .app
        .clone()
        .oneshot(request("GET", "/api/cart/count", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(json_body(count).await["count"], 0);
}

#[tokio::test]
async fn test_oversized_quantity_rejected() {
    let h = harness().await;
    let response = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/cart/add/{}", h.fx.bulb.id),
            None,
            &json!({ "quantity": u32::MAX }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["fields"], json!(["quantity"]));
}

#[tokio::test]
async fn test_unknown_cart_action_is_bad_request() {
    let h = harness().await;
    let response = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/cart/update/{}/double", h.fx.bulb.id),
            None,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_guest_checkout_and_confirmation() {
    let h = harness().await;

    let added = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/cart/add/{}", h.fx.lamp.id),
            None,
            &json!({ "variant_id": h.fx.lamp_variant.id }),
        ))
        .await
        .unwrap();
    let cookie = session_cookie(&added).unwrap();

    let placed = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/checkout",
            Some(&cookie),
            &checkout_body(),
        ))
        .await
        .unwrap();
    assert_eq!(placed.status(), StatusCode::CREATED);
    let order = json_body(placed).await;
    assert_eq!(order["status"], "processing");
    let order_id = order["id"].as_i64().unwrap();

    let confirmation = h
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/orders/{order_id}/confirmation"),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(confirmation.status(), StatusCode::OK);
    let detail = json_body(confirmation).await;
    assert_eq!(detail["items"].as_array().unwrap().len(), 1);
    assert_eq!(detail["address"]["full_name"], "Ada Lovelace");

    let stranger = h
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/orders/{order_id}/confirmation"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(stranger.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_errors() {
    let h = harness().await;

    let empty = h
        .app
        .clone()
        .oneshot(json_request("POST", "/api/checkout", None, &checkout_body()))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::CONFLICT);

    let added = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/cart/add/{}", h.fx.bulb.id),
            None,
            &json!({}),
        ))
        .await
        .unwrap();
    let cookie = session_cookie(&added).unwrap();

    let mut incomplete = checkout_body();
    incomplete["city"] = json!("");
    let invalid = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/checkout",
            Some(&cookie),
            &incomplete,
        ))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(invalid).await["fields"], json!(["city"]));
}

// =============================================================================
// Signed-in routes
// =============================================================================

#[tokio::test]
async fn test_account_requires_sign_in() {
    let h = harness().await;

    let anonymous = h
        .app
        .clone()
        .oneshot(request("GET", "/api/account/orders", None))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let cookie = signed_in_cookie(&h.sessions, &user(1)).await;
    let signed_in = h
        .app
        .clone()
        .oneshot(request("GET", "/api/account/orders", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(signed_in.status(), StatusCode::OK);
    let body = json_body(signed_in).await;
    assert_eq!(body["active"], json!([]));
    assert_eq!(body["history"], json!([]));
}

#[tokio::test]
async fn test_address_book_over_http() {
    let h = harness().await;
    let cookie = signed_in_cookie(&h.sessions, &user(1)).await;

    let mut body = checkout_body();
    body["is_default"] = json!(true);
    let created = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/account/addresses",
            Some(&cookie),
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let address_id = json_body(created).await["id"].as_i64().unwrap();

    body["city"] = json!("York");
    let updated = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/account/addresses/{address_id}"),
            Some(&cookie),
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = json_body(updated).await;
    assert_eq!(updated["id"].as_i64(), Some(address_id));
    assert_eq!(updated["city"], "York");
    assert_eq!(updated["is_default"], true);

    let list = h
        .app
        .clone()
        .oneshot(request("GET", "/api/account/addresses", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(json_body(list).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reviews_over_http() {
    let h = harness().await;
    let uri = "/api/products/arc-lamp/reviews";
    let review = json!({ "rating": 5, "comment": "Lovely glow" });

    let anonymous = h
        .app
        .clone()
        .oneshot(json_request("POST", uri, None, &review))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let cookie = signed_in_cookie(&h.sessions, &user(1)).await;
    let created = h
        .app
        .clone()
        .oneshot(json_request("POST", uri, Some(&cookie), &review))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let duplicate = h
        .app
        .clone()
        .oneshot(json_request("POST", uri, Some(&cookie), &review))
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let listed = h
        .app
        .clone()
        .oneshot(request("GET", uri, None))
        .await
        .unwrap();
    let body = json_body(listed).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["comment"], "Lovely glow");
}

#[tokio::test]
async fn test_guest_wishlist_toggle() {
    let h = harness().await;
    let uri = format!("/api/wishlist/{}/toggle", h.fx.lamp.id);

    let on = h
        .app
        .clone()
        .oneshot(request("POST", &uri, None))
        .await
        .unwrap();
    assert_eq!(on.status(), StatusCode::OK);
    let cookie = session_cookie(&on).unwrap();
    let body = json_body(on).await;
    assert_eq!(body["in_wishlist"], true);
    assert_eq!(body["count"], 1);

    let off = h
        .app
        .clone()
        .oneshot(request("POST", &uri, Some(&cookie)))
        .await
        .unwrap();
    let body = json_body(off).await;
    assert_eq!(body["in_wishlist"], false);
    assert_eq!(body["count"], 0);
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_admin_requires_staff() {
    let h = harness().await;

    let customer = signed_in_cookie(&h.sessions, &user(1)).await;
    let forbidden = h
        .app
        .clone()
        .oneshot(request("GET", "/api/admin/orders", Some(&customer)))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let admin = signed_in_cookie(&h.sessions, &staff(99)).await;
    let allowed = h
        .app
        .clone()
        .oneshot(request("GET", "/api/admin/orders", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_status_changes() {
    let h = harness().await;
    let customer = signed_in_cookie(&h.sessions, &user(1)).await;
    let admin = signed_in_cookie(&h.sessions, &staff(99)).await;

    h.app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/cart/add/{}", h.fx.bulb.id),
            Some(&customer),
            &json!({}),
        ))
        .await
        .unwrap();
    let placed = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/checkout",
            Some(&customer),
            &checkout_body(),
        ))
        .await
        .unwrap();
    let order_id = json_body(placed).await["id"].as_i64().unwrap();

    let shipped = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&admin),
            &json!({ "status": "shipped" }),
        ))
        .await
        .unwrap();
    assert_eq!(shipped.status(), StatusCode::OK);
    let body = json_body(shipped).await;
    assert_eq!(body["status"], "shipped");
    assert_eq!(body["status_changes"].as_array().unwrap().len(), 1);

    let skipped = h
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&admin),
            &json!({ "status": "processing" }),
        ))
        .await
        .unwrap();
    assert_eq!(skipped.status(), StatusCode::CONFLICT);

    let cancelled = h
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/admin/orders/{order_id}/cancel"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(cancelled.status(), StatusCode::OK);

    let listed = h
        .app
        .clone()
        .oneshot(request(
            "GET",
            "/api/admin/orders?status=cancelled",
            Some(&admin),
        ))
        .await
        .unwrap();
    let body = json_body(listed).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["full_name"], "Ada Lovelace");
}
