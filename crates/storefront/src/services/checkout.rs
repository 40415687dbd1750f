//! Checkout orchestration.
//!
//! Converts the caller's cart into an order inside one store transaction:
//!
//! 1. Lock the cart and read its lines
//! 2. Resolve the delivery address
//! 3. Snapshot the total at current prices
//! 4. Insert the order and its lines with frozen prices
//! 5. Adjust product and variant inventory
//! 6. Empty the cart
//!
//! Nothing is written unless every step succeeds. The cart lock makes a
//! second submit wait and then find an empty cart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::instrument;

use lumen_core::{AddressFields, ProductId, ValidAddress, VariantId};

use crate::db::{RepositoryError, Store, StoreTx};
use crate::error::ShopError;
use crate::models::{Address, CartLine, NewOrder, NewOrderItem, Order, cart_total};

use super::identity::{RequestContext, SessionState};

/// Message returned to callers when checkout fails for a server-side reason.
const CHECKOUT_FAILED: &str = "Checkout failed, please try again";

/// Places orders.
pub struct CheckoutService<'a> {
    store: &'a dyn Store,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Place an order from the caller's cart.
    ///
    /// With `save_address`, a signed-in user's address is reused if an
    /// identical one exists, otherwise stored in their address book. Guests
    /// get the new order id remembered in their session so they can view the
    /// confirmation.
    ///
    /// # Errors
    ///
    /// - `ShopError::Validation` if the address is incomplete or invalid
    /// - `ShopError::EmptyCart` if there is nothing to order
    /// - `ShopError::Internal` if any storage step fails; nothing is persisted
    #[instrument(skip(self, session, address), fields(owner = %ctx.owner))]
    pub async fn place_order(
        &self,
        ctx: &RequestContext,
        session: &dyn SessionState,
        address: &AddressFields,
        save_address: bool,
    ) -> Result<Order, ShopError> {
        let address = address.validate()?;

        let tx = self.store.begin().await.map_err(checkout_failed)?;
        let order = Self::checkout_with(tx, ctx, &address, save_address, Utc::now()).await?;

        if ctx.is_guest()
            && let Err(e) = session.remember_guest_order(order.id).await
        {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to link guest order to session");
        }

        Ok(order)
    }

    /// Run checkout inside an already open transaction, committing on success.
    ///
    /// Dropping `tx` on any failure rolls back every write.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::EmptyCart` if the cart is missing or empty, or
    /// `ShopError::Internal` if any storage step fails.
    pub async fn checkout_with(
        mut tx: Box<dyn StoreTx>,
        ctx: &RequestContext,
        address: &ValidAddress,
        save_address: bool,
        now: DateTime<Utc>,
    ) -> Result<Order, ShopError> {
        let placed = match place(tx.as_mut(), ctx, address, save_address, now).await {
            Ok(Some(placed)) => placed,
            Ok(None) => return Err(ShopError::EmptyCart),
            Err(e) => return Err(checkout_failed(e)),
        };
        tx.commit().await.map_err(checkout_failed)?;

        tracing::info!(
            order_id = %placed.order.id,
            total = %placed.order.total,
            lines = placed.lines,
            address_id = %placed.address.id,
            guest = ctx.is_guest(),
            "Order placed"
        );
        Ok(placed.order)
    }
}

struct Placed {
    order: Order,
    address: Address,
    lines: usize,
}

fn checkout_failed(err: RepositoryError) -> ShopError {
    tracing::error!(error = %err, "Checkout rolled back");
    ShopError::Internal(CHECKOUT_FAILED)
}

/// All checkout writes. `None` when there is nothing to order.
async fn place(
    tx: &mut dyn StoreTx,
    ctx: &RequestContext,
    address: &ValidAddress,
    save_address: bool,
    now: DateTime<Utc>,
) -> Result<Option<Placed>, RepositoryError> {
    let Some(cart) = tx.lock_cart(&ctx.owner).await? else {
        return Ok(None);
    };
    let lines = tx.cart_lines(cart.id).await?;
    if lines.is_empty() {
        return Ok(None);
    }

    let address = match (ctx.user_id(), save_address) {
        (Some(user), true) => match tx.find_address(user, address).await? {
            Some(existing) => existing,
            None => tx.insert_address(Some(user), address).await?,
        },
        _ => tx.insert_address(None, address).await?,
    };

    let order = tx
        .insert_order(&NewOrder {
            user_id: ctx.user_id(),
            address_id: address.id,
            total: cart_total(&lines),
            created_at: now,
        })
        .await?;

    for line in &lines {
        let pricing = line.pricing();
        tx.insert_order_item(&NewOrderItem {
            order_id: order.id,
            product_id: line.item.product_id,
            variant_id: line.item.variant_id,
            quantity: line.item.quantity,
            price: pricing.original_unit_price(),
            discounted_price: pricing.effective_unit_price(),
        })
        .await?;
    }

    adjust_inventory(tx, &lines, now).await?;

    let item_ids: Vec<_> = lines.iter().map(|l| l.item.id).collect();
    tx.clear_cart(cart.id, &item_ids).await?;

    Ok(Some(Placed {
        order,
        address,
        lines: lines.len(),
    }))
}

/// Record the sale on every product and variant, clamping stock at zero.
async fn adjust_inventory(
    tx: &mut dyn StoreTx,
    lines: &[CartLine],
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    // Only feeds the oversell warnings; the store applies the clamp.
    let mut product_stock: HashMap<ProductId, i64> = HashMap::new();
    let mut variant_stock: HashMap<VariantId, i64> = HashMap::new();

    for line in lines {
        let quantity = i64::from(line.item.quantity);

        let remaining = product_stock
            .entry(line.product.id)
            .or_insert_with(|| i64::from(line.product.stock));
        if *remaining < quantity {
            tracing::warn!(
                product_id = %line.product.id,
                stock = *remaining,
                quantity,
                "Product oversold, clamping stock at zero"
            );
        }
        *remaining = (*remaining - quantity).max(0);
        tx.record_product_sale(line.product.id, line.item.quantity, now)
            .await?;

        if let Some(variant) = &line.variant {
            let remaining = variant_stock
                .entry(variant.id)
                .or_insert_with(|| i64::from(variant.stock));
            if *remaining < quantity {
                tracing::warn!(
                    variant_id = %variant.id,
                    stock = *remaining,
                    quantity,
                    "Variant oversold, clamping stock at zero"
                );
            }
            *remaining = (*remaining - quantity).max(0);
            tx.decrement_variant_stock(variant.id, line.item.quantity)
                .await?;
        }
    }
    Ok(())
}
