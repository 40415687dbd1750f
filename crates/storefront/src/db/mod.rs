//! Persistence for the storefront.
//!
//! # Schema: `shop`
//!
//! - `categories`, `brands`, `tags`, `products`, `product_tags`, `product_variants`
//! - `carts` - One per user or guest session key
//! - `cart_items` - Unique on (cart, product, variant), NULL variants compare equal
//! - `addresses` - Delivery addresses, optionally owned by a user
//! - `orders`, `order_items` - Placed orders with frozen prices
//! - `reviews` - Unique on (product, user)
//! - `wishlist_items` - Unique on (user, product)
//!
//! Sessions live in the `tower_sessions` schema managed by
//! `tower-sessions-sqlx-store`.
//!
//! # Backends
//!
//! Services talk to a [`Store`], never to a pool. [`PgStore`] is the production
//! backend; [`MemoryStore`] backs tests and local development.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p lumen-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use lumen_core::{
    AddressId, CartId, CartItemId, OrderId, OrderStatus, OwnerKey, ProductId, UserId, ValidAddress,
    VariantId,
};

use crate::models::{
    Address, Brand, Cart, CartAction, CartItem, CartItemChange, CartLine, Category, NewBrand,
    NewCategory, NewOrder, NewOrderItem, NewProduct, NewReview, NewTag, NewVariant, Order,
    OrderFilter, OrderItem, OrderListing, Page, Product, ProductFilter, ProductVariant,
    RatingSummary, Review, Tag, WishlistItem,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Embedded storefront migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate review).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Pool ceiling
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2.min(max_connections))
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Catalog reads and writes.
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn insert_category(&self, new: &NewCategory, slug: &str)
    -> Result<Category, RepositoryError>;
    async fn insert_brand(&self, new: &NewBrand, slug: &str) -> Result<Brand, RepositoryError>;
    async fn insert_tag(&self, new: &NewTag, slug: &str) -> Result<Tag, RepositoryError>;
    /// Insert a product and its tag links.
    async fn insert_product(&self, new: &NewProduct, slug: &str)
    -> Result<Product, RepositoryError>;
    async fn insert_variant(&self, new: &NewVariant) -> Result<ProductVariant, RepositoryError>;
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError>;
    async fn brand_by_slug(&self, slug: &str) -> Result<Option<Brand>, RepositoryError>;
    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepositoryError>;
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError>;
    async fn variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError>;
    async fn variants(&self, product: ProductId) -> Result<Vec<ProductVariant>, RepositoryError>;
    async fn product_tags(&self, product: ProductId) -> Result<Vec<Tag>, RepositoryError>;
    /// Available products matching the filter, one page.
    async fn list_products(&self, filter: &ProductFilter)
    -> Result<Page<Product>, RepositoryError>;
}

/// Cart rows. Every mutation is a single atomic statement.
#[async_trait]
pub trait CartRepo: Send + Sync {
    /// Fetch the owner's cart, creating it if absent. Safe under concurrency.
    async fn get_or_create_cart(&self, owner: &OwnerKey) -> Result<Cart, RepositoryError>;
    async fn find_cart(&self, owner: &OwnerKey) -> Result<Option<Cart>, RepositoryError>;
    /// Lines in insertion order.
    async fn cart_lines(&self, cart: CartId) -> Result<Vec<CartLine>, RepositoryError>;
    /// Insert a line or add `quantity` to the existing one.
    async fn add_cart_item(
        &self,
        cart: CartId,
        product: ProductId,
        variant: Option<VariantId>,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError>;
    /// Apply an action to the matching line. `None` if there is no such line.
    async fn apply_cart_action(
        &self,
        cart: CartId,
        product: ProductId,
        variant: Option<VariantId>,
        action: CartAction,
    ) -> Result<Option<CartItemChange>, RepositoryError>;
    /// Delete one line of this cart. `false` if it was not in the cart.
    async fn remove_cart_item(&self, cart: CartId, item: CartItemId)
    -> Result<bool, RepositoryError>;
}

/// Order reads and status writes.
#[async_trait]
pub trait OrderRepo: Send + Sync {
    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError>;
    /// A user's orders in the given statuses, newest first.
    async fn orders_for_user(
        &self,
        user: UserId,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError>;
    /// All orders matching the filter, newest first.
    async fn list_orders(&self, filter: &OrderFilter)
    -> Result<Vec<OrderListing>, RepositoryError>;
    /// Compare-and-set the status, appending to the history.
    ///
    /// `None` when the order is missing or its status is no longer `from`.
    async fn transition_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Address book rows.
#[async_trait]
pub trait AddressRepo: Send + Sync {
    async fn address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError>;
    /// Default first, then newest.
    async fn addresses_for_user(&self, user: UserId) -> Result<Vec<Address>, RepositoryError>;
    /// Insert an owned address, clearing the user's other defaults if `is_default`.
    async fn insert_user_address(
        &self,
        user: UserId,
        address: &ValidAddress,
        is_default: bool,
    ) -> Result<Address, RepositoryError>;
    /// Update an owned address in place unless an order references it.
    ///
    /// `None` when the address is not the user's or is referenced.
    async fn update_unreferenced_address(
        &self,
        user: UserId,
        id: AddressId,
        address: &ValidAddress,
        is_default: bool,
    ) -> Result<Option<Address>, RepositoryError>;
}

/// Review rows.
#[async_trait]
pub trait ReviewRepo: Send + Sync {
    /// Insert a review. [`RepositoryError::Conflict`] on a duplicate (product, user).
    async fn insert_review(&self, new: &NewReview) -> Result<Review, RepositoryError>;
    /// Newest first.
    async fn reviews_for_product(&self, product: ProductId)
    -> Result<Vec<Review>, RepositoryError>;
    async fn rating_summary(&self, product: ProductId) -> Result<RatingSummary, RepositoryError>;
}

/// Persisted wishlists for authenticated users.
#[async_trait]
pub trait WishlistRepo: Send + Sync {
    /// Highest priority first, then oldest.
    async fn wishlist_items(&self, user: UserId) -> Result<Vec<WishlistItem>, RepositoryError>;
    /// `true` if a row was inserted, `false` if already present.
    async fn add_wishlist_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError>;
    /// `true` if a row was deleted.
    async fn remove_wishlist_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError>;
}

/// A storefront persistence backend.
#[async_trait]
pub trait Store:
    CatalogRepo + CartRepo + OrderRepo + AddressRepo + ReviewRepo + WishlistRepo
{
    /// Begin a checkout transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// A checkout transaction.
///
/// Dropping without [`StoreTx::commit`] rolls back every write.
#[async_trait]
pub trait StoreTx: Send {
    /// Find and lock the owner's cart row.
    async fn lock_cart(&mut self, owner: &OwnerKey) -> Result<Option<Cart>, RepositoryError>;
    /// Lines of a locked cart, locking the products they refer to.
    async fn cart_lines(&mut self, cart: CartId) -> Result<Vec<CartLine>, RepositoryError>;
    /// A user's address at the same location (name, phone, street, city, state,
    /// postal code, country).
    async fn find_address(
        &mut self,
        user: UserId,
        address: &ValidAddress,
    ) -> Result<Option<Address>, RepositoryError>;
    async fn insert_address(
        &mut self,
        user: Option<UserId>,
        address: &ValidAddress,
    ) -> Result<Address, RepositoryError>;
    /// Insert an order in `processing`.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError>;
    async fn insert_order_item(&mut self, item: &NewOrderItem)
    -> Result<OrderItem, RepositoryError>;
    /// Floor-clamped stock decrement, `sold` increment and `last_sold` stamp.
    async fn record_product_sale(
        &mut self,
        product: ProductId,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> Result<Product, RepositoryError>;
    /// Floor-clamped variant stock decrement.
    async fn decrement_variant_stock(
        &mut self,
        variant: VariantId,
        quantity: u32,
    ) -> Result<ProductVariant, RepositoryError>;
    /// Delete the given lines of the cart. The cart row is kept.
    async fn clear_cart(&mut self, cart: CartId, items: &[CartItemId])
    -> Result<u64, RepositoryError>;
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Convert a quantity for an `INTEGER` column.
pub(crate) fn quantity_to_i32(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} out of range")))
}

/// Convert a stored quantity back.
pub(crate) fn quantity_from_i32(quantity: i32) -> Result<u32, RepositoryError> {
    u32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative quantity {quantity}")))
}
