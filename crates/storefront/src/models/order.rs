//! Address and order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lumen_core::{
    AddressId, OrderId, OrderItemId, OrderStatus, ProductId, UserId, ValidAddress, VariantId,
};

/// A stored delivery address.
///
/// Rows referenced by an order are never modified in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub id: AddressId,
    /// Owning user; `None` for guest checkout and unsaved addresses.
    pub user_id: Option<UserId>,
    #[serde(flatten)]
    pub fields: ValidAddress,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// One entry in an order's status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// `None` for guest orders.
    pub user_id: Option<UserId>,
    pub address_id: AddressId,
    /// Snapshot taken at checkout. Never recomputed.
    pub total: Decimal,
    pub status: OrderStatus,
    pub status_changes: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for inserting an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub address_id: AddressId,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A line of a placed order with prices frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    /// Original unit price (ignores discount, includes variant surcharge).
    pub price: Decimal,
    /// Unit price actually charged.
    pub discounted_price: Decimal,
}

impl OrderItem {
    /// Charged unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.discounted_price * Decimal::from(self.quantity)
    }
}

/// Values for inserting an order line.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub price: Decimal,
    pub discounted_price: Decimal,
}

/// An order with its address and lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub address: Address,
    pub items: Vec<OrderItem>,
}

/// An order as shown in the admin list.
#[derive(Debug, Clone, Serialize)]
pub struct OrderListing {
    #[serde(flatten)]
    pub order: Order,
    pub full_name: String,
    pub phone: String,
}

/// Admin order list filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    /// Matches the order id, recipient name or phone, case-insensitively.
    #[serde(default)]
    pub search: Option<String>,
}

impl OrderFilter {
    /// The search term, trimmed, if non-empty.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// In-memory form of the search predicate.
    #[must_use]
    pub fn matches(&self, order: &Order, address: &Address) -> bool {
        if self.status.is_some_and(|s| s != order.status) {
            return false;
        }
        let Some(term) = self.search_term() else {
            return true;
        };
        let term = term.to_lowercase();
        order.id.to_string() == term
            || address.fields.full_name.to_lowercase().contains(&term)
            || address.fields.phone.to_lowercase().contains(&term)
    }
}

/// The orders shown on an account page.
#[derive(Debug, Clone, Serialize)]
pub struct AccountOrders {
    pub active: Vec<Order>,
    pub history: Vec<Order>,
}
