//! Cart domain types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lumen_core::{CartId, CartItemId, OwnerKey, Pricing, ProductId, VariantId};

use super::catalog::{Product, ProductVariant};

/// Largest quantity a single cart line may hold. Merges and increases stop
/// here.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// A cart, owned by exactly one user or guest session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub owner: OwnerKey,
    pub created_at: DateTime<Utc>,
}

/// One stored cart row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    /// Always at least 1.
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

/// A cart item joined with the product and variant it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
    pub variant: Option<ProductVariant>,
}

impl CartLine {
    /// Price inputs for this line.
    #[must_use]
    pub fn pricing(&self) -> Pricing {
        self.product.pricing(self.variant.as_ref())
    }

    /// Effective unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.pricing().line_total(self.item.quantity)
    }
}

/// Sum of line subtotals.
#[must_use]
pub fn cart_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::subtotal).sum()
}

/// Sum of line quantities, saturating at `u32::MAX`.
#[must_use]
pub fn item_count(lines: &[CartLine]) -> u32 {
    lines
        .iter()
        .fold(0u32, |count, l| count.saturating_add(l.item.quantity))
}

/// Error for an unrecognised cart action.
#[derive(Debug, thiserror::Error)]
#[error("unknown cart action: {0}")]
pub struct UnknownCartAction(pub String);

/// A quantity change requested for an existing cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    Increase,
    Decrease,
    Remove,
}

impl FromStr for CartAction {
    type Err = UnknownCartAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "increase" => Ok(Self::Increase),
            "decrease" => Ok(Self::Decrease),
            "remove" => Ok(Self::Remove),
            other => Err(UnknownCartAction(other.to_owned())),
        }
    }
}

/// What a cart action did to the stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartItemChange {
    Updated(CartItem),
    Removed,
}

/// Result of a cart update, shaped for the cart page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartUpdate {
    pub quantity: u32,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub cart_count: u32,
    pub removed: bool,
}

/// A priced cart line for display.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub product_slug: String,
    pub name: String,
    pub variant_id: Option<VariantId>,
    pub variant_label: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub original_unit_price: Decimal,
    pub discount_percentage: u32,
    pub subtotal: Decimal,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        let pricing = line.pricing();
        Self {
            item_id: line.item.id,
            product_id: line.product.id,
            product_slug: line.product.slug.clone(),
            name: line.product.name.clone(),
            variant_id: line.item.variant_id,
            variant_label: line.variant.as_ref().map(ProductVariant::label),
            quantity: line.item.quantity,
            unit_price: pricing.effective_unit_price(),
            original_unit_price: pricing.original_unit_price(),
            discount_percentage: pricing.discount_percentage(),
            subtotal: line.subtotal(),
        }
    }
}

/// A whole cart, priced, for display.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: Decimal,
    pub item_count: u32,
}

impl CartView {
    /// Create an empty cart view.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            lines: Vec::new(),
            total: Decimal::ZERO,
            item_count: 0,
        }
    }
}

impl From<&[CartLine]> for CartView {
    fn from(lines: &[CartLine]) -> Self {
        Self {
            lines: lines.iter().map(CartLineView::from).collect(),
            total: cart_total(lines),
            item_count: item_count(lines),
        }
    }
}
