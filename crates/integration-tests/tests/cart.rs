//! Integration tests for cart operations.
//!
//! These tests drive `CartService` against the in-memory store.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use lumen_integration_tests::{fixture, guest_ctx, user_ctx};
use lumen_storefront::error::ShopError;
use lumen_storefront::models::{CartAction, MAX_LINE_QUANTITY};
use lumen_storefront::services::CartService;

// =============================================================================
// Adding
// =============================================================================

#[tokio::test]
async fn test_adding_same_product_merges_quantity() {
    let fx = fixture().await;
    let cart = CartService::new(&fx.store);
    let owner = guest_ctx("guest-a").owner;

    let first = cart.add_item(&owner, fx.bulb.id, None, 1).await.unwrap();
    let second = cart.add_item(&owner, fx.bulb.id, None, 2).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.quantity, 3);
    assert_eq!(cart.count(&owner).await.unwrap(), 3);
    assert_eq!(cart.total(&owner).await.unwrap(), Decimal::new(75, 0));
}

#[tokio::test]
async fn test_variant_is_a_separate_line() {
    let fx = fixture().await;
    let cart = CartService::new(&fx.store);
    let owner = guest_ctx("guest-b").owner;

    cart.add_item(&owner, fx.lamp.id, None, 1).await.unwrap();
    cart.add_item(&owner, fx.lamp.id, Some(fx.lamp_variant.id), 2)
        .await
        .unwrap();

    let view = cart.view(&owner).await.unwrap();
    assert_eq!(view.lines.len(), 2);
    assert_eq!(view.item_count, 3);

    let base = view.lines.iter().find(|l| l.variant_id.is_none()).unwrap();
    assert_eq!(base.unit_price, Decimal::new(80, 0));
    assert_eq!(base.discount_percentage, 20);

    let variant = view.lines.iter().find(|l| l.variant_id.is_some()).unwrap();
    assert_eq!(variant.unit_price, Decimal::new(95, 0));
    assert_eq!(variant.original_unit_price, Decimal::new(115, 0));
    assert_eq!(variant.subtotal, Decimal::new(190, 0));

    assert_eq!(view.total, Decimal::new(270, 0));
}

#[tokio::test]
async fn test_add_rejects_bad_input() {
    let fx = fixture().await;
    let cart = CartService::new(&fx.store);
    let owner = guest_ctx("guest-c").owner;

    assert!(matches!(
        cart.add_item(&owner, fx.bulb.id, None, 0).await,
        Err(ShopError::Validation { .. })
    ));
    assert!(matches!(
        cart.add_item(&owner, lumen_core::ProductId::new(9999), None, 1)
            .await,
        Err(ShopError::NotFound("Product"))
    ));
    // The lamp's variant does not belong to the bulb.
    assert!(matches!(
        cart.add_item(&owner, fx.bulb.id, Some(fx.lamp_variant.id), 1)
            .await,
        Err(ShopError::NotFound("Variant"))
    ));
    assert_eq!(cart.count(&owner).await.unwrap(), 0);
}

#[tokio::test]
async fn test_line_quantity_is_capped() {
    let fx = fixture().await;
    let cart = CartService::new(&fx.store);
    let owner = guest_ctx("guest-bulk").owner;

    for quantity in [MAX_LINE_QUANTITY + 1, u32::MAX] {
        assert!(matches!(
            cart.add_item(&owner, fx.bulb.id, None, quantity).await,
            Err(ShopError::Validation { .. })
        ));
    }

    cart.add_item(&owner, fx.bulb.id, None, MAX_LINE_QUANTITY)
        .await
        .unwrap();
    let merged = cart.add_item(&owner, fx.bulb.id, None, 1).await.unwrap();
    assert_eq!(merged.quantity, MAX_LINE_QUANTITY);

    let increased = cart
        .update_item(&owner, fx.bulb.id, None, CartAction::Increase)
        .await
        .unwrap();
    assert_eq!(increased.quantity, MAX_LINE_QUANTITY);

    cart.add_item(&owner, fx.lamp.id, None, MAX_LINE_QUANTITY)
        .await
        .unwrap();
    cart.add_item(&owner, fx.lamp.id, Some(fx.lamp_variant.id), MAX_LINE_QUANTITY)
        .await
        .unwrap();
    assert_eq!(cart.count(&owner).await.unwrap(), 3 * MAX_LINE_QUANTITY);
}

// =============================================================================
// Updating and removing
// =============================================================================

#[tokio::test]
async fn test_update_actions() {
    let fx = fixture().await;
    let cart = CartService::new(&fx.store);
    let owner = guest_ctx("guest-d").owner;
    cart.add_item(&owner, fx.bulb.id, None, 1).await.unwrap();

    let up = cart
        .update_item(&owner, fx.bulb.id, None, CartAction::Increase)
        .await
        .unwrap();
    assert_eq!(up.quantity, 2);
    assert_eq!(up.subtotal, Decimal::new(50, 0));
    assert_eq!(up.cart_count, 2);
    assert!(!up.removed);

    cart.update_item(&owner, fx.bulb.id, None, CartAction::Decrease)
        .await
        .unwrap();
    let gone = cart
        .update_item(&owner, fx.bulb.id, None, CartAction::Decrease)
        .await
        .unwrap();
    assert!(gone.removed);
    assert_eq!(gone.total, Decimal::ZERO);
    assert_eq!(gone.cart_count, 0);

    assert!(matches!(
        cart.update_item(&owner, fx.bulb.id, None, CartAction::Increase)
            .await,
        Err(ShopError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_remove_only_from_own_cart() {
    let fx = fixture().await;
    let cart = CartService::new(&fx.store);
    let alice = guest_ctx("guest-alice").owner;
    let bob = guest_ctx("guest-bob").owner;

    let item = cart.add_item(&alice, fx.bulb.id, None, 1).await.unwrap();
    cart.add_item(&bob, fx.lamp.id, None, 1).await.unwrap();

    assert!(matches!(
        cart.remove_item(&bob, item.id).await,
        Err(ShopError::NotFound(_))
    ));
    assert_eq!(cart.count(&alice).await.unwrap(), 1);

    let total = cart.remove_item(&alice, item.id).await.unwrap();
    assert_eq!(total, Decimal::ZERO);
}

#[tokio::test]
async fn test_guest_and_user_carts_are_separate() {
    let fx = fixture().await;
    let cart = CartService::new(&fx.store);
    let guest = guest_ctx("guest-e").owner;
    let user = user_ctx(7).owner;

    cart.add_item(&guest, fx.bulb.id, None, 2).await.unwrap();
    cart.add_item(&user, fx.lamp.id, None, 1).await.unwrap();

    assert_eq!(cart.count(&guest).await.unwrap(), 2);
    assert_eq!(cart.count(&user).await.unwrap(), 1);
    assert_ne!(
        cart.cart(&guest).await.unwrap().id,
        cart.cart(&user).await.unwrap().id
    );
}

#[tokio::test]
async fn test_unknown_owner_sees_empty_cart() {
    let fx = fixture().await;
    let cart = CartService::new(&fx.store);
    let view = cart.view(&guest_ctx("nobody").owner).await.unwrap();
    assert!(view.lines.is_empty());
    assert_eq!(view.total, Decimal::ZERO);
}
