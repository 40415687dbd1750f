//! Integration tests for checkout.
//!
//! Covers totals and frozen prices, inventory adjustment, address reuse,
//! concurrent submits and rollback when a storage step fails part way through.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use lumen_core::{
    CartId, CartItemId, OrderStatus, OwnerKey, ProductId, UserId, ValidAddress, VariantId,
};
use lumen_integration_tests::{address, fixture, guest_ctx, session, user_ctx};
use lumen_storefront::db::{OrderRepo, RepositoryError, Store, StoreTx};
use lumen_storefront::error::ShopError;
use lumen_storefront::models::{
    Address, Cart, CartLine, NewOrder, NewOrderItem, Order, OrderFilter, OrderItem, Product,
    ProductVariant,
};
use lumen_storefront::services::{CartService, CheckoutService, OrderService, SessionState};

// =============================================================================
// Placing orders
// =============================================================================

#[tokio::test]
async fn test_guest_checkout_snapshots_order() {
    let fx = fixture().await;
    let ctx = guest_ctx("guest-checkout");
    let session = session();
    let cart = CartService::new(&fx.store);
    cart.add_item(&ctx.owner, fx.lamp.id, None, 1).await.unwrap();
    cart.add_item(&ctx.owner, fx.lamp.id, Some(fx.lamp_variant.id), 2)
        .await
        .unwrap();
    cart.add_item(&ctx.owner, fx.bulb.id, None, 1).await.unwrap();

    let order = CheckoutService::new(&fx.store)
        .place_order(&ctx, &session, &address("Ada Lovelace"), false)
        .await
        .unwrap();

    // 80 + 2 * 95 + 25
    assert_eq!(order.total, Decimal::new(295, 0));
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.user_id, None);

    let items = fx.store.order_items(order.id).await.unwrap();
    assert_eq!(items.len(), 3);
    let line_sum: Decimal = items.iter().map(OrderItem::line_total).sum();
    assert_eq!(line_sum, order.total);

    let variant_line = items.iter().find(|i| i.variant_id.is_some()).unwrap();
    assert_eq!(variant_line.price, Decimal::new(115, 0));
    assert_eq!(variant_line.discounted_price, Decimal::new(95, 0));

    assert_eq!(cart.count(&ctx.owner).await.unwrap(), 0);
    assert_eq!(session.guest_order().await.unwrap(), Some(order.id));
}

#[tokio::test]
async fn test_checkout_adjusts_inventory() {
    let fx = fixture().await;
    let ctx = guest_ctx("guest-stock");
    let cart = CartService::new(&fx.store);
    cart.add_item(&ctx.owner, fx.lamp.id, None, 1).await.unwrap();
    cart.add_item(&ctx.owner, fx.lamp.id, Some(fx.lamp_variant.id), 2)
        .await
        .unwrap();

    CheckoutService::new(&fx.store)
        .place_order(&ctx, &session(), &address("Ada Lovelace"), false)
        .await
        .unwrap();

    let lamp = fx.product(&fx.lamp).await;
    assert_eq!(lamp.stock, 7);
    assert_eq!(lamp.sold, 3);
    assert!(lamp.last_sold.is_some());
    assert_eq!(fx.variant(&fx.lamp_variant).await.stock, 1);
}

#[tokio::test]
async fn test_oversold_stock_clamps_at_zero() {
    let fx = fixture().await;
    let ctx = guest_ctx("guest-oversell");
    CartService::new(&fx.store)
        .add_item(&ctx.owner, fx.bulb.id, None, 7)
        .await
        .unwrap();

    CheckoutService::new(&fx.store)
        .place_order(&ctx, &session(), &address("Ada Lovelace"), false)
        .await
        .unwrap();

    let bulb = fx.product(&fx.bulb).await;
    assert_eq!(bulb.stock, 0);
    assert_eq!(bulb.sold, 7);
}

#[tokio::test]
async fn test_empty_cart_and_double_submit() {
    let fx = fixture().await;
    let ctx = guest_ctx("guest-double");
    let checkout = CheckoutService::new(&fx.store);

    assert!(matches!(
        checkout
            .place_order(&ctx, &session(), &address("Ada Lovelace"), false)
            .await,
        Err(ShopError::EmptyCart)
    ));

    CartService::new(&fx.store)
        .add_item(&ctx.owner, fx.bulb.id, None, 1)
        .await
        .unwrap();
    checkout
        .place_order(&ctx, &session(), &address("Ada Lovelace"), false)
        .await
        .unwrap();
    assert!(matches!(
        checkout
            .place_order(&ctx, &session(), &address("Ada Lovelace"), false)
            .await,
        Err(ShopError::EmptyCart)
    ));
}

#[tokio::test]
async fn test_concurrent_submits_place_one_order() {
    let fx = fixture().await;
    let ctx = guest_ctx("guest-race");
    CartService::new(&fx.store)
        .add_item(&ctx.owner, fx.lamp.id, None, 2)
        .await
        .unwrap();

    let checkout = CheckoutService::new(&fx.store);
    let (first_session, second_session) = (session(), session());
    let fields = address("Ada Lovelace");
    let (first, second) = tokio::join!(
        checkout.place_order(&ctx, &first_session, &fields, false),
        checkout.place_order(&ctx, &second_session, &fields, false),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(ShopError::EmptyCart)))
            .count(),
        1
    );

    let orders = OrderService::new(&fx.store)
        .list_orders(&OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(fx.product(&fx.lamp).await.sold, 2);
}

#[tokio::test]
async fn test_invalid_address_names_missing_fields() {
    let fx = fixture().await;
    let ctx = guest_ctx("guest-invalid");
    CartService::new(&fx.store)
        .add_item(&ctx.owner, fx.bulb.id, None, 1)
        .await
        .unwrap();

    let mut fields = address("Ada Lovelace");
    fields.city = None;
    fields.phone = Some("   ".into());

    let err = CheckoutService::new(&fx.store)
        .place_order(&ctx, &session(), &fields, false)
        .await
        .unwrap_err();
    let ShopError::Validation { fields, .. } = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(fields, vec!["city".to_owned(), "phone".to_owned()]);

    assert_eq!(fx.store.address_count().await, 0);
    assert_eq!(
        CartService::new(&fx.store).count(&ctx.owner).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_saved_address_is_reused() {
    let fx = fixture().await;
    let ctx = user_ctx(3);
    let cart = CartService::new(&fx.store);
    let checkout = CheckoutService::new(&fx.store);

    cart.add_item(&ctx.owner, fx.bulb.id, None, 1).await.unwrap();
    let first = checkout
        .place_order(&ctx, &session(), &address("Ada Lovelace"), true)
        .await
        .unwrap();

    cart.add_item(&ctx.owner, fx.bulb.id, None, 1).await.unwrap();
    let second = checkout
        .place_order(&ctx, &session(), &address("Ada Lovelace"), true)
        .await
        .unwrap();

    assert_eq!(first.user_id, Some(UserId::new(3)));
    assert_eq!(first.address_id, second.address_id);
    assert_eq!(fx.store.address_count().await, 1);

    cart.add_item(&ctx.owner, fx.bulb.id, None, 1).await.unwrap();
    let unsaved = checkout
        .place_order(&ctx, &session(), &address("Ada Lovelace"), false)
        .await
        .unwrap();
    assert_ne!(unsaved.address_id, first.address_id);
    assert_eq!(fx.store.address_count().await, 2);
}

#[tokio::test]
async fn test_guest_checkouts_never_share_addresses() {
    let fx = fixture().await;
    let ctx = guest_ctx("guest-repeat");
    let cart = CartService::new(&fx.store);
    let checkout = CheckoutService::new(&fx.store);

    cart.add_item(&ctx.owner, fx.bulb.id, None, 1).await.unwrap();
    let first = checkout
        .place_order(&ctx, &session(), &address("Ada Lovelace"), false)
        .await
        .unwrap();

    cart.add_item(&ctx.owner, fx.bulb.id, None, 1).await.unwrap();
    let second = checkout
        .place_order(&ctx, &session(), &address("Ada Lovelace"), false)
        .await
        .unwrap();

    assert_ne!(first.address_id, second.address_id);
    assert_eq!(fx.store.address_count().await, 2);
}

// =============================================================================
// Rollback
// =============================================================================

/// Checkout step at which [`FailingTx`] errors.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FailAt {
    OrderItem,
    VariantStock,
    ClearCart,
}

/// Delegating transaction that fails at one step.
struct FailingTx {
    inner: Box<dyn StoreTx>,
    fail_at: FailAt,
}

impl FailingTx {
    fn check(&self, step: FailAt) -> Result<(), RepositoryError> {
        if self.fail_at == step {
            return Err(RepositoryError::DataCorruption("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTx for FailingTx {
    async fn lock_cart(&mut self, owner: &OwnerKey) -> Result<Option<Cart>, RepositoryError> {
        self.inner.lock_cart(owner).await
    }

    async fn cart_lines(&mut self, cart: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        self.inner.cart_lines(cart).await
    }

    async fn find_address(
        &mut self,
        user: UserId,
        address: &ValidAddress,
    ) -> Result<Option<Address>, RepositoryError> {
        self.inner.find_address(user, address).await
    }

    async fn insert_address(
        &mut self,
        user: Option<UserId>,
        address: &ValidAddress,
    ) -> Result<Address, RepositoryError> {
        self.inner.insert_address(user, address).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        self.inner.insert_order(order).await
    }

    async fn insert_order_item(
        &mut self,
        item: &NewOrderItem,
    ) -> Result<OrderItem, RepositoryError> {
        self.check(FailAt::OrderItem)?;
        self.inner.insert_order_item(item).await
    }

    async fn record_product_sale(
        &mut self,
        product: ProductId,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> Result<Product, RepositoryError> {
        self.inner.record_product_sale(product, quantity, at).await
    }

    async fn decrement_variant_stock(
        &mut self,
        variant: VariantId,
        quantity: u32,
    ) -> Result<ProductVariant, RepositoryError> {
        self.check(FailAt::VariantStock)?;
        self.inner.decrement_variant_stock(variant, quantity).await
    }

    async fn clear_cart(
        &mut self,
        cart: CartId,
        items: &[CartItemId],
    ) -> Result<u64, RepositoryError> {
        self.check(FailAt::ClearCart)?;
        self.inner.clear_cart(cart, items).await
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.inner.commit().await
    }
}

async fn assert_rolled_back(fail_at: FailAt) {
    let fx = fixture().await;
    let ctx = guest_ctx("guest-rollback");
    let cart = CartService::new(&fx.store);
    cart.add_item(&ctx.owner, fx.lamp.id, Some(fx.lamp_variant.id), 2)
        .await
        .unwrap();

    let tx = Box::new(FailingTx {
        inner: fx.store.begin().await.unwrap(),
        fail_at,
    });
    let valid = address("Ada Lovelace").validate().unwrap();
    let err = CheckoutService::checkout_with(tx, &ctx, &valid, false, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Internal(_)));
    assert!(err.is_server_error());

    // Nothing persisted: no address, untouched stock, cart intact.
    assert_eq!(fx.store.address_count().await, 0);
    assert_eq!(fx.product(&fx.lamp).await.stock, 10);
    assert_eq!(fx.product(&fx.lamp).await.sold, 0);
    assert_eq!(fx.variant(&fx.lamp_variant).await.stock, 3);
    assert_eq!(cart.count(&ctx.owner).await.unwrap(), 2);
}

#[tokio::test]
async fn test_failure_writing_lines_rolls_back() {
    assert_rolled_back(FailAt::OrderItem).await;
}

#[tokio::test]
async fn test_failure_adjusting_stock_rolls_back() {
    assert_rolled_back(FailAt::VariantStock).await;
}

#[tokio::test]
async fn test_partial_inventory_update_rolls_back() {
    let fx = fixture().await;
    let ctx = guest_ctx("guest-partial");
    let cart = CartService::new(&fx.store);
    // The bulb sale is recorded before the variant decrement fails.
    cart.add_item(&ctx.owner, fx.bulb.id, None, 2).await.unwrap();
    cart.add_item(&ctx.owner, fx.lamp.id, Some(fx.lamp_variant.id), 1)
        .await
        .unwrap();

    let tx = Box::new(FailingTx {
        inner: fx.store.begin().await.unwrap(),
        fail_at: FailAt::VariantStock,
    });
    let valid = address("Ada Lovelace").validate().unwrap();
    CheckoutService::checkout_with(tx, &ctx, &valid, false, Utc::now())
        .await
        .unwrap_err();

    let bulb = fx.product(&fx.bulb).await;
    assert_eq!((bulb.stock, bulb.sold), (5, 0));
    assert!(bulb.last_sold.is_none());
    let lamp = fx.product(&fx.lamp).await;
    assert_eq!((lamp.stock, lamp.sold), (10, 0));
    assert_eq!(fx.variant(&fx.lamp_variant).await.stock, 3);
    assert_eq!(cart.count(&ctx.owner).await.unwrap(), 3);
    assert_eq!(fx.store.address_count().await, 0);
}

#[tokio::test]
async fn test_failure_clearing_cart_rolls_back() {
    assert_rolled_back(FailAt::ClearCart).await;
}

#[tokio::test]
async fn test_store_usable_after_rollback() {
    let fx = fixture().await;
    let ctx = guest_ctx("guest-retry");
    CartService::new(&fx.store)
        .add_item(&ctx.owner, fx.bulb.id, None, 1)
        .await
        .unwrap();

    let tx = Box::new(FailingTx {
        inner: fx.store.begin().await.unwrap(),
        fail_at: FailAt::ClearCart,
    });
    let valid = address("Ada Lovelace").validate().unwrap();
    CheckoutService::checkout_with(tx, &ctx, &valid, false, Utc::now())
        .await
        .unwrap_err();

    let order = CheckoutService::new(&fx.store)
        .place_order(&ctx, &session(), &address("Ada Lovelace"), false)
        .await
        .unwrap();
    assert_eq!(order.total, Decimal::new(25, 0));
    assert!(fx.store.order(order.id).await.unwrap().is_some());
}
