//! Cart service.
//!
//! Every mutation is a single atomic statement in the store, so concurrent
//! requests against the same cart never lose updates.

use rust_decimal::Decimal;
use tracing::instrument;

use lumen_core::{CartItemId, OwnerKey, ProductId, VariantId};

use crate::db::Store;
use crate::error::ShopError;
use crate::models::{
    Cart, CartAction, CartItem, CartItemChange, CartLine, CartUpdate, CartView,
    MAX_LINE_QUANTITY, cart_total, item_count,
};

/// Cart operations for one owner at a time.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The owner's cart, created on first use.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn cart(&self, owner: &OwnerKey) -> Result<Cart, ShopError> {
        Ok(self.store.get_or_create_cart(owner).await?)
    }

    /// Add `quantity` of a product (or one of its variants) to the cart.
    ///
    /// A line never holds more than [`MAX_LINE_QUANTITY`]; merging into an
    /// existing line stops there.
    ///
    /// # Errors
    ///
    /// - `ShopError::Validation` if `quantity` is zero or above
    ///   [`MAX_LINE_QUANTITY`], or the product is not available
    /// - `ShopError::NotFound` if the product or variant does not exist, or the
    ///   variant belongs to another product
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn add_item(
        &self,
        owner: &OwnerKey,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: u32,
    ) -> Result<CartItem, ShopError> {
        if quantity == 0 {
            return Err(ShopError::invalid_field(
                "quantity",
                "Quantity must be at least 1",
            ));
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(ShopError::invalid_field(
                "quantity",
                format!("Quantity must be at most {MAX_LINE_QUANTITY}"),
            ));
        }

        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or(ShopError::NotFound("Product"))?;
        if !product.available {
            return Err(ShopError::validation(format!(
                "{} is not available",
                product.name
            )));
        }

        if let Some(variant_id) = variant_id {
            let variant = self
                .store
                .variant(variant_id)
                .await?
                .filter(|v| v.product_id == product_id)
                .ok_or(ShopError::NotFound("Variant"))?;
            tracing::debug!(variant = %variant.label(), "Adding variant");
        }

        let cart = self.store.get_or_create_cart(owner).await?;
        let item = self
            .store
            .add_cart_item(cart.id, product_id, variant_id, quantity)
            .await?;
        tracing::info!(cart_id = %cart.id, quantity = item.quantity, "Cart item added");
        Ok(item)
    }

    /// Increase, decrease or remove the line for a product/variant.
    ///
    /// Decreasing a line at quantity 1 removes it.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the cart has no such line.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn update_item(
        &self,
        owner: &OwnerKey,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        action: CartAction,
    ) -> Result<CartUpdate, ShopError> {
        let cart = self
            .store
            .find_cart(owner)
            .await?
            .ok_or(ShopError::NotFound("Cart item"))?;

        let change = self
            .store
            .apply_cart_action(cart.id, product_id, variant_id, action)
            .await?
            .ok_or(ShopError::NotFound("Cart item"))?;

        let lines = self.store.cart_lines(cart.id).await?;
        let total = cart_total(&lines);
        let cart_count = item_count(&lines);

        let update = match change {
            CartItemChange::Updated(item) => {
                let subtotal = lines
                    .iter()
                    .find(|l| l.item.id == item.id)
                    .map_or(Decimal::ZERO, CartLine::subtotal);
                CartUpdate {
                    quantity: item.quantity,
                    subtotal,
                    total,
                    cart_count,
                    removed: false,
                }
            }
            CartItemChange::Removed => CartUpdate {
                quantity: 0,
                subtotal: Decimal::ZERO,
                total,
                cart_count,
                removed: true,
            },
        };
        Ok(update)
    }

    /// Remove a line by id. Returns the new cart total.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the line is not in the caller's cart.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn remove_item(
        &self,
        owner: &OwnerKey,
        item_id: CartItemId,
    ) -> Result<Decimal, ShopError> {
        let cart = self
            .store
            .find_cart(owner)
            .await?
            .ok_or(ShopError::NotFound("Cart item"))?;

        if !self.store.remove_cart_item(cart.id, item_id).await? {
            return Err(ShopError::NotFound("Cart item"));
        }

        let lines = self.store.cart_lines(cart.id).await?;
        Ok(cart_total(&lines))
    }

    /// Priced lines and total. An owner with no cart sees an empty one.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn view(&self, owner: &OwnerKey) -> Result<CartView, ShopError> {
        let lines = self.lines(owner).await?;
        Ok(CartView::from(lines.as_slice()))
    }

    /// Sum of quantities, for the header badge.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn count(&self, owner: &OwnerKey) -> Result<u32, ShopError> {
        Ok(item_count(&self.lines(owner).await?))
    }

    /// Cart total at current prices.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn total(&self, owner: &OwnerKey) -> Result<Decimal, ShopError> {
        Ok(cart_total(&self.lines(owner).await?))
    }

    async fn lines(&self, owner: &OwnerKey) -> Result<Vec<CartLine>, ShopError> {
        match self.store.find_cart(owner).await? {
            Some(cart) => Ok(self.store.cart_lines(cart.id).await?),
            None => Ok(Vec::new()),
        }
    }
}
