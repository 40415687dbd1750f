//! `PostgreSQL` backend.
//!
//! Queries are runtime-checked (`sqlx::query_as`) against the `shop` schema and
//! decode into `*Row` structs, which convert into domain models.

mod addresses;
mod carts;
mod catalog;
mod orders;
mod reviews;
mod wishlist;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use lumen_core::{
    AddressId, BrandId, CartId, CartItemId, CategoryId, Email, OrderId, OrderItemId, OrderStatus,
    OwnerKey, ProductId, SessionKey, UserId, ValidAddress, VariantId,
};

use super::{RepositoryError, Store, StoreTx, quantity_from_i32, quantity_to_i32};
use crate::models::{
    Address, Cart, CartItem, CartLine, NewOrder, NewOrderItem, Order, OrderItem, Product,
    ProductVariant, StatusChange,
};

/// `PostgreSQL`-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (for the session store).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// An open checkout transaction.
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn lock_cart(&mut self, owner: &OwnerKey) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, session_key, created_at
            FROM shop.carts
            WHERE user_id IS NOT DISTINCT FROM $1 AND session_key IS NOT DISTINCT FROM $2
            FOR UPDATE
            ",
        )
        .bind(owner.user_id())
        .bind(owner.session_key().map(SessionKey::as_str))
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn cart_lines(&mut self, cart: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        load_cart_lines(&mut *self.tx, cart, true).await
    }

    async fn find_address(
        &mut self,
        user: UserId,
        address: &ValidAddress,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, full_name, email, street, city, state, postal_code,
                   country, phone, is_default, created_at
            FROM shop.addresses
            WHERE user_id = $1 AND full_name = $2 AND phone = $3 AND street = $4
              AND city = $5 AND state = $6 AND postal_code = $7 AND country = $8
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(user)
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Address::try_from).transpose()
    }

    async fn insert_address(
        &mut self,
        user: Option<UserId>,
        address: &ValidAddress,
    ) -> Result<Address, RepositoryError> {
        addresses::insert(&mut *self.tx, user, address, false).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO shop.orders (user_id, address_id, total, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, user_id, address_id, total, status, status_changes, created_at, updated_at
            ",
        )
        .bind(order.user_id)
        .bind(order.address_id)
        .bind(order.total)
        .bind(OrderStatus::Processing.as_str())
        .bind(order.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Order::try_from(row)
    }

    async fn insert_order_item(
        &mut self,
        item: &NewOrderItem,
    ) -> Result<OrderItem, RepositoryError> {
        let row = sqlx::query_as::<_, OrderItemRow>(
            r"
            INSERT INTO shop.order_items
                (order_id, product_id, variant_id, quantity, price, discounted_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, order_id, product_id, variant_id, quantity, price, discounted_price
            ",
        )
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.variant_id)
        .bind(quantity_to_i32(item.quantity)?)
        .bind(item.price)
        .bind(item.discounted_price)
        .fetch_one(&mut *self.tx)
        .await?;

        OrderItem::try_from(row)
    }

    async fn record_product_sale(
        &mut self,
        product: ProductId,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE shop.products
            SET stock = GREATEST(stock - $2, 0),
                sold = sold + $2,
                last_sold = $3,
                updated_at = $3
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product)
        .bind(quantity_to_i32(quantity)?)
        .bind(at)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    async fn decrement_variant_stock(
        &mut self,
        variant: VariantId,
        quantity: u32,
    ) -> Result<ProductVariant, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(&format!(
            r"
            UPDATE shop.product_variants
            SET stock = GREATEST(stock - $2, 0)
            WHERE id = $1
            RETURNING {VARIANT_COLUMNS}
            "
        ))
        .bind(variant)
        .bind(quantity_to_i32(quantity)?)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(ProductVariant::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    async fn clear_cart(
        &mut self,
        cart: CartId,
        items: &[CartItemId],
    ) -> Result<u64, RepositoryError> {
        let ids: Vec<i32> = items.iter().map(CartItemId::as_i32).collect();
        let result = sqlx::query("DELETE FROM shop.cart_items WHERE cart_id = $1 AND id = ANY($2)")
            .bind(cart)
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Shared queries
// =============================================================================

pub(super) const PRODUCT_COLUMNS: &str = "id, category_id, brand_id, name, slug, description, \
    price, discount_price, stock, sold, available, featured, last_sold, created_at, updated_at";

pub(super) const VARIANT_COLUMNS: &str =
    "id, product_id, wattage, color, shape, size, additional_price, stock";

/// Load a cart's lines with their products and variants.
///
/// With `lock`, the item and product rows are locked for the transaction.
pub(super) async fn load_cart_lines(
    conn: &mut PgConnection,
    cart: CartId,
    lock: bool,
) -> Result<Vec<CartLine>, RepositoryError> {
    let items = sqlx::query_as::<_, CartItemRow>(&format!(
        r"
        SELECT id, cart_id, product_id, variant_id, quantity, added_at
        FROM shop.cart_items
        WHERE cart_id = $1
        ORDER BY id
        {}
        ",
        if lock { "FOR UPDATE" } else { "" }
    ))
    .bind(cart)
    .fetch_all(&mut *conn)
    .await?;

    if items.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<i32> = items.iter().map(|i| i.product_id.as_i32()).collect();
    let products = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE id = ANY($1) ORDER BY id {}",
        if lock { "FOR UPDATE" } else { "" }
    ))
    .bind(product_ids)
    .fetch_all(&mut *conn)
    .await?;

    let variant_ids: Vec<i32> = items
        .iter()
        .filter_map(|i| i.variant_id.map(|v| v.as_i32()))
        .collect();
    let variants = if variant_ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM shop.product_variants WHERE id = ANY($1) ORDER BY id {}",
            if lock { "FOR UPDATE" } else { "" }
        ))
        .bind(variant_ids)
        .fetch_all(&mut *conn)
        .await?
    };

    let products: Vec<Product> = products.into_iter().map(Product::from).collect();
    let variants = variants
        .into_iter()
        .map(ProductVariant::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    items
        .into_iter()
        .map(|row| {
            let item = CartItem::try_from(row)?;
            let product = products
                .iter()
                .find(|p| p.id == item.product_id)
                .cloned()
                .ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "cart item {} references missing product",
                        item.id
                    ))
                })?;
            let variant = match item.variant_id {
                Some(id) => Some(variants.iter().find(|v| v.id == id).cloned().ok_or_else(
                    || {
                        RepositoryError::DataCorruption(format!(
                            "cart item {} references missing variant",
                            item.id
                        ))
                    },
                )?),
                None => None,
            };
            Ok(CartLine {
                item,
                product,
                variant,
            })
        })
        .collect()
}

/// Map a unique violation to [`RepositoryError::Conflict`].
pub(super) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
pub(super) struct ProductRow {
    id: ProductId,
    category_id: CategoryId,
    brand_id: Option<BrandId>,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    discount_price: Option<Decimal>,
    stock: i32,
    sold: i32,
    available: bool,
    featured: bool,
    last_sold: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            category_id: r.category_id,
            brand_id: r.brand_id,
            name: r.name,
            slug: r.slug,
            description: r.description,
            price: r.price,
            discount_price: r.discount_price,
            stock: r.stock,
            sold: r.sold,
            available: r.available,
            featured: r.featured,
            last_sold: r.last_sold,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct VariantRow {
    id: VariantId,
    product_id: ProductId,
    wattage: Option<i32>,
    color: Option<String>,
    shape: Option<String>,
    size: Option<String>,
    additional_price: Option<Decimal>,
    stock: i32,
}

impl TryFrom<VariantRow> for ProductVariant {
    type Error = RepositoryError;

    fn try_from(r: VariantRow) -> Result<Self, Self::Error> {
        let wattage = r
            .wattage
            .map(u32::try_from)
            .transpose()
            .map_err(|_| RepositoryError::DataCorruption(format!("variant {} wattage", r.id)))?;
        Ok(Self {
            id: r.id,
            product_id: r.product_id,
            wattage,
            color: r.color,
            shape: r.shape,
            size: r.size,
            additional_price: r.additional_price,
            stock: r.stock,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct CartRow {
    id: CartId,
    user_id: Option<UserId>,
    session_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(r: CartRow) -> Result<Self, Self::Error> {
        let owner = match (r.user_id, r.session_key) {
            (Some(user), None) => OwnerKey::User(user),
            (None, Some(key)) => OwnerKey::Session(SessionKey::new(key).ok_or_else(|| {
                RepositoryError::DataCorruption(format!("cart {} has an invalid session key", r.id))
            })?),
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "cart {} must have exactly one owner",
                    r.id
                )));
            }
        };
        Ok(Self {
            id: r.id,
            owner,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct CartItemRow {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    quantity: i32,
    added_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(r: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            cart_id: r.cart_id,
            product_id: r.product_id,
            variant_id: r.variant_id,
            quantity: quantity_from_i32(r.quantity)?,
            added_at: r.added_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct AddressRow {
    id: AddressId,
    user_id: Option<UserId>,
    full_name: String,
    email: String,
    street: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    phone: String,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AddressRow> for Address {
    type Error = RepositoryError;

    fn try_from(r: AddressRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            fields: ValidAddress {
                full_name: r.full_name,
                email,
                street: r.street,
                city: r.city,
                state: r.state,
                postal_code: r.postal_code,
                country: r.country,
                phone: r.phone,
            },
            is_default: r.is_default,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    address_id: AddressId,
    total: Decimal,
    status: String,
    status_changes: Json<Vec<StatusChange>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let status = r.status.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", r.id))
        })?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            address_id: r.address_id,
            total: r.total,
            status,
            status_changes: r.status_changes.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    quantity: i32,
    price: Decimal,
    discounted_price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(r: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            variant_id: r.variant_id,
            quantity: quantity_from_i32(r.quantity)?,
            price: r.price,
            discounted_price: r.discounted_price,
        })
    }
}
