//! In-memory backend.
//!
//! Holds every table in one [`MemoryState`] behind a `tokio` mutex. A
//! transaction takes the lock for its whole lifetime and works on a copy of
//! the state; commit swaps the copy in, drop discards it. Used by tests and
//! local development without `PostgreSQL`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use lumen_core::{
    AddressId, BrandId, CartId, CartItemId, CategoryId, OrderId, OrderItemId, OrderStatus,
    OwnerKey, ProductId, ReviewId, TagId, UserId, ValidAddress, VariantId, WishlistItemId,
};

use super::{
    AddressRepo, CartRepo, CatalogRepo, OrderRepo, RepositoryError, ReviewRepo, Store, StoreTx,
    WishlistRepo,
};
use crate::models::{
    Address, Brand, Cart, CartAction, CartItem, CartItemChange, CartLine, Category,
    MAX_LINE_QUANTITY, NewBrand, NewCategory, NewOrder, NewOrderItem, NewProduct, NewReview,
    NewTag, NewVariant, Order, OrderFilter, OrderItem, OrderListing, PAGE_SIZE, Page, Product,
    ProductFilter, ProductSort, ProductVariant, RatingSummary, Review, StatusChange, Tag,
    WishlistItem,
};

/// Every table, as plain vectors in insertion (id) order.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    next_id: i32,
    categories: Vec<Category>,
    brands: Vec<Brand>,
    tags: Vec<Tag>,
    products: Vec<Product>,
    product_tags: Vec<(ProductId, TagId)>,
    variants: Vec<ProductVariant>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItem>,
    addresses: Vec<Address>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    reviews: Vec<Review>,
    wishlist: Vec<WishlistItem>,
}

impl MemoryState {
    /// Ids are unique across tables, which is harmless and simple.
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn find_cart(&self, owner: &OwnerKey) -> Option<&Cart> {
        self.carts.iter().find(|c| &c.owner == owner)
    }

    fn cart_lines(&self, cart: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        self.cart_items
            .iter()
            .filter(|i| i.cart_id == cart)
            .map(|item| {
                let product = self.product(item.product_id).cloned().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "cart item {} references missing product",
                        item.id
                    ))
                })?;
                let variant = match item.variant_id {
                    Some(id) => Some(
                        self.variants
                            .iter()
                            .find(|v| v.id == id)
                            .cloned()
                            .ok_or_else(|| {
                                RepositoryError::DataCorruption(format!(
                                    "cart item {} references missing variant",
                                    item.id
                                ))
                            })?,
                    ),
                    None => None,
                };
                Ok(CartLine {
                    item: item.clone(),
                    product,
                    variant,
                })
            })
            .collect()
    }

    fn insert_address(
        &mut self,
        user: Option<UserId>,
        address: &ValidAddress,
        is_default: bool,
    ) -> Address {
        if let (true, Some(user)) = (is_default, user) {
            self.clear_defaults(user, None);
        }
        let created = Address {
            id: AddressId::new(self.next_id()),
            user_id: user,
            fields: address.clone(),
            is_default,
            created_at: Utc::now(),
        };
        self.addresses.push(created.clone());
        created
    }

    fn clear_defaults(&mut self, user: UserId, keep: Option<AddressId>) {
        for a in &mut self.addresses {
            if a.user_id == Some(user) && Some(a.id) != keep {
                a.is_default = false;
            }
        }
    }

    fn check_unique_slug<'a>(
        mut existing: impl Iterator<Item = &'a str>,
        slug: &str,
        what: &str,
    ) -> Result<(), RepositoryError> {
        if existing.any(|s| s == slug) {
            return Err(RepositoryError::Conflict(format!("{what} already exists")));
        }
        Ok(())
    }
}

/// In-memory [`Store`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored addresses, owned or not.
    pub async fn address_count(&self) -> usize {
        self.state.lock().await.addresses.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl CatalogRepo for MemoryStore {
    async fn insert_category(
        &self,
        new: &NewCategory,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        let mut s = self.state.lock().await;
        MemoryState::check_unique_slug(
            s.categories.iter().map(|c| c.slug.as_str()),
            slug,
            "category",
        )?;
        let category = Category {
            id: CategoryId::new(s.next_id()),
            name: new.name.clone(),
            slug: slug.to_owned(),
            description: new.description.clone(),
        };
        s.categories.push(category.clone());
        Ok(category)
    }

    async fn insert_brand(&self, new: &NewBrand, slug: &str) -> Result<Brand, RepositoryError> {
        let mut s = self.state.lock().await;
        MemoryState::check_unique_slug(s.brands.iter().map(|b| b.slug.as_str()), slug, "brand")?;
        if s.brands.iter().any(|b| b.name == new.name) {
            return Err(RepositoryError::Conflict("brand already exists".to_owned()));
        }
        let brand = Brand {
            id: BrandId::new(s.next_id()),
            name: new.name.clone(),
            slug: slug.to_owned(),
            description: new.description.clone(),
        };
        s.brands.push(brand.clone());
        Ok(brand)
    }

    async fn insert_tag(&self, new: &NewTag, slug: &str) -> Result<Tag, RepositoryError> {
        let mut s = self.state.lock().await;
        MemoryState::check_unique_slug(s.tags.iter().map(|t| t.slug.as_str()), slug, "tag")?;
        let tag = Tag {
            id: TagId::new(s.next_id()),
            name: new.name.clone(),
            slug: slug.to_owned(),
        };
        s.tags.push(tag.clone());
        Ok(tag)
    }

    async fn insert_product(
        &self,
        new: &NewProduct,
        slug: &str,
    ) -> Result<Product, RepositoryError> {
        let mut s = self.state.lock().await;
        MemoryState::check_unique_slug(
            s.products.iter().map(|p| p.slug.as_str()),
            slug,
            "product",
        )?;
        if !s.categories.iter().any(|c| c.id == new.category_id) {
            return Err(RepositoryError::NotFound);
        }
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(s.next_id()),
            category_id: new.category_id,
            brand_id: new.brand_id,
            name: new.name.clone(),
            slug: slug.to_owned(),
            description: new.description.clone(),
            price: new.price,
            discount_price: new.discount_price,
            stock: new.stock,
            sold: 0,
            available: new.available,
            featured: new.featured,
            last_sold: None,
            created_at: now,
            updated_at: now,
        };
        for tag in &new.tag_ids {
            s.product_tags.push((product.id, *tag));
        }
        s.products.push(product.clone());
        Ok(product)
    }

    async fn insert_variant(&self, new: &NewVariant) -> Result<ProductVariant, RepositoryError> {
        let mut s = self.state.lock().await;
        if s.product(new.product_id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        let variant = ProductVariant {
            id: VariantId::new(s.next_id()),
            product_id: new.product_id,
            wattage: new.wattage,
            color: new.color.clone(),
            shape: new.shape.clone(),
            size: new.size.clone(),
            additional_price: new.additional_price,
            stock: new.stock,
        };
        s.variants.push(variant.clone());
        Ok(variant)
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let s = self.state.lock().await;
        Ok(s.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn brand_by_slug(&self, slug: &str) -> Result<Option<Brand>, RepositoryError> {
        let s = self.state.lock().await;
        Ok(s.brands.iter().find(|b| b.slug == slug).cloned())
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepositoryError> {
        let s = self.state.lock().await;
        Ok(s.tags.iter().find(|t| t.slug == slug).cloned())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.lock().await.product(id).cloned())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let s = self.state.lock().await;
        Ok(s.products.iter().find(|p| p.slug == slug).cloned())
    }

    async fn variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        let s = self.state.lock().await;
        Ok(s.variants.iter().find(|v| v.id == id).cloned())
    }

    async fn variants(&self, product: ProductId) -> Result<Vec<ProductVariant>, RepositoryError> {
        let s = self.state.lock().await;
        Ok(s.variants
            .iter()
            .filter(|v| v.product_id == product)
            .cloned()
            .collect())
    }

    async fn product_tags(&self, product: ProductId) -> Result<Vec<Tag>, RepositoryError> {
        let s = self.state.lock().await;
        let mut tags: Vec<Tag> = s
            .product_tags
            .iter()
            .filter(|(p, _)| *p == product)
            .filter_map(|(_, t)| s.tags.iter().find(|tag| tag.id == *t).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Page<Product>, RepositoryError> {
        let s = self.state.lock().await;
        let mut matching: Vec<&Product> = s
            .products
            .iter()
            .filter(|p| p.available)
            .filter(|p| filter.category.is_none_or(|c| p.category_id == c))
            .filter(|p| filter.brand.is_none_or(|b| p.brand_id == Some(b)))
            .filter(|p| filter.price_min.is_none_or(|m| p.effective_price() >= m))
            .filter(|p| filter.price_max.is_none_or(|m| p.effective_price() <= m))
            .collect();

        match filter.sort {
            ProductSort::PriceLowToHigh => {
                matching.sort_by(|a, b| {
                    a.effective_price()
                        .cmp(&b.effective_price())
                        .then(a.id.cmp(&b.id))
                });
            }
            ProductSort::PriceHighToLow => {
                matching.sort_by(|a, b| {
                    b.effective_price()
                        .cmp(&a.effective_price())
                        .then(a.id.cmp(&b.id))
                });
            }
            ProductSort::NewestFirst => {
                matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            }
        }

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(PAGE_SIZE as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, filter.page(), total))
    }
}

#[async_trait]
impl CartRepo for MemoryStore {
    async fn get_or_create_cart(&self, owner: &OwnerKey) -> Result<Cart, RepositoryError> {
        let mut s = self.state.lock().await;
        if let Some(cart) = s.find_cart(owner) {
            return Ok(cart.clone());
        }
        let cart = Cart {
            id: CartId::new(s.next_id()),
            owner: owner.clone(),
            created_at: Utc::now(),
        };
        s.carts.push(cart.clone());
        Ok(cart)
    }

    async fn find_cart(&self, owner: &OwnerKey) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.state.lock().await.find_cart(owner).cloned())
    }

    async fn cart_lines(&self, cart: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        self.state.lock().await.cart_lines(cart)
    }

    async fn add_cart_item(
        &self,
        cart: CartId,
        product: ProductId,
        variant: Option<VariantId>,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError> {
        let mut s = self.state.lock().await;
        if let Some(item) = s
            .cart_items
            .iter_mut()
            .find(|i| i.cart_id == cart && i.product_id == product && i.variant_id == variant)
        {
            item.quantity = item
                .quantity
                .saturating_add(quantity)
                .min(MAX_LINE_QUANTITY);
            return Ok(item.clone());
        }
        let item = CartItem {
            id: CartItemId::new(s.next_id()),
            cart_id: cart,
            product_id: product,
            variant_id: variant,
            quantity: quantity.min(MAX_LINE_QUANTITY),
            added_at: Utc::now(),
        };
        s.cart_items.push(item.clone());
        Ok(item)
    }

    async fn apply_cart_action(
        &self,
        cart: CartId,
        product: ProductId,
        variant: Option<VariantId>,
        action: CartAction,
    ) -> Result<Option<CartItemChange>, RepositoryError> {
        let mut s = self.state.lock().await;
        let Some(pos) = s
            .cart_items
            .iter()
            .position(|i| i.cart_id == cart && i.product_id == product && i.variant_id == variant)
        else {
            return Ok(None);
        };

        let remove = match action {
            CartAction::Remove => true,
            CartAction::Decrease => s.cart_items.get(pos).is_some_and(|i| i.quantity <= 1),
            CartAction::Increase => false,
        };
        if remove {
            s.cart_items.remove(pos);
            return Ok(Some(CartItemChange::Removed));
        }

        let Some(item) = s.cart_items.get_mut(pos) else {
            return Ok(None);
        };
        if action == CartAction::Increase {
            item.quantity = item.quantity.saturating_add(1).min(MAX_LINE_QUANTITY);
        } else {
            item.quantity = item.quantity.saturating_sub(1);
        }
        Ok(Some(CartItemChange::Updated(item.clone())))
    }

    async fn remove_cart_item(
        &self,
        cart: CartId,
        item: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let mut s = self.state.lock().await;
        let before = s.cart_items.len();
        s.cart_items.retain(|i| !(i.id == item && i.cart_id == cart));
        Ok(s.cart_items.len() < before)
    }
}

#[async_trait]
impl OrderRepo for MemoryStore {
    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let s = self.state.lock().await;
        Ok(s.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let s = self.state.lock().await;
        Ok(s.order_items
            .iter()
            .filter(|i| i.order_id == id)
            .cloned()
            .collect())
    }

    async fn orders_for_user(
        &self,
        user: UserId,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError> {
        let s = self.state.lock().await;
        let mut orders: Vec<Order> = s
            .orders
            .iter()
            .filter(|o| o.user_id == Some(user) && statuses.contains(&o.status))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
    ) -> Result<Vec<OrderListing>, RepositoryError> {
        let s = self.state.lock().await;
        let mut listings = Vec::new();
        for order in &s.orders {
            let address = s
                .addresses
                .iter()
                .find(|a| a.id == order.address_id)
                .ok_or_else(|| {
                    RepositoryError::DataCorruption(format!("order {} has no address", order.id))
                })?;
            if filter.matches(order, address) {
                listings.push(OrderListing {
                    order: order.clone(),
                    full_name: address.fields.full_name.clone(),
                    phone: address.fields.phone.clone(),
                });
            }
        }
        listings.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then(b.order.id.cmp(&a.order.id))
        });
        Ok(listings)
    }

    async fn transition_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut s = self.state.lock().await;
        let Some(order) = s
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.status == from)
        else {
            return Ok(None);
        };
        order.status = to;
        order.updated_at = at;
        order.status_changes.push(StatusChange { from, to, at });
        Ok(Some(order.clone()))
    }
}

#[async_trait]
impl AddressRepo for MemoryStore {
    async fn address(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let s = self.state.lock().await;
        Ok(s.addresses.iter().find(|a| a.id == id).cloned())
    }

    async fn addresses_for_user(&self, user: UserId) -> Result<Vec<Address>, RepositoryError> {
        let s = self.state.lock().await;
        let mut addresses: Vec<Address> = s
            .addresses
            .iter()
            .filter(|a| a.user_id == Some(user))
            .cloned()
            .collect();
        addresses.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });
        Ok(addresses)
    }

    async fn insert_user_address(
        &self,
        user: UserId,
        address: &ValidAddress,
        is_default: bool,
    ) -> Result<Address, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .insert_address(Some(user), address, is_default))
    }

    async fn update_unreferenced_address(
        &self,
        user: UserId,
        id: AddressId,
        address: &ValidAddress,
        is_default: bool,
    ) -> Result<Option<Address>, RepositoryError> {
        let mut s = self.state.lock().await;
        if s.orders.iter().any(|o| o.address_id == id) {
            return Ok(None);
        }
        let Some(existing) = s
            .addresses
            .iter_mut()
            .find(|a| a.id == id && a.user_id == Some(user))
        else {
            return Ok(None);
        };
        existing.fields = address.clone();
        existing.is_default = is_default;
        let updated = existing.clone();
        if is_default {
            s.clear_defaults(user, Some(id));
        }
        Ok(Some(updated))
    }
}

#[async_trait]
impl ReviewRepo for MemoryStore {
    async fn insert_review(&self, new: &NewReview) -> Result<Review, RepositoryError> {
        let mut s = self.state.lock().await;
        if s.product(new.product_id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        if s
            .reviews
            .iter()
            .any(|r| r.product_id == new.product_id && r.user_id == new.user_id)
        {
            return Err(RepositoryError::Conflict("review already exists".to_owned()));
        }
        let review = Review {
            id: ReviewId::new(s.next_id()),
            product_id: new.product_id,
            user_id: new.user_id,
            rating: new.rating,
            comment: new.comment.clone(),
            created_at: new.created_at,
        };
        s.reviews.push(review.clone());
        Ok(review)
    }

    async fn reviews_for_product(
        &self,
        product: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let s = self.state.lock().await;
        let mut reviews: Vec<Review> = s
            .reviews
            .iter()
            .filter(|r| r.product_id == product)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }

    async fn rating_summary(&self, product: ProductId) -> Result<RatingSummary, RepositoryError> {
        let s = self.state.lock().await;
        Ok(RatingSummary::from_ratings(
            s.reviews
                .iter()
                .filter(|r| r.product_id == product)
                .map(|r| r.rating),
        ))
    }
}

#[async_trait]
impl WishlistRepo for MemoryStore {
    async fn wishlist_items(&self, user: UserId) -> Result<Vec<WishlistItem>, RepositoryError> {
        let s = self.state.lock().await;
        let mut items: Vec<WishlistItem> = s
            .wishlist
            .iter()
            .filter(|w| w.user_id == user)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn add_wishlist_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut s = self.state.lock().await;
        if s.product(product).is_none() {
            return Err(RepositoryError::NotFound);
        }
        if s
            .wishlist
            .iter()
            .any(|w| w.user_id == user && w.product_id == product)
        {
            return Ok(false);
        }
        let item = WishlistItem {
            id: WishlistItemId::new(s.next_id()),
            user_id: user,
            product_id: product,
            priority: 1,
            notes: None,
            added_at: Utc::now(),
        };
        s.wishlist.push(item);
        Ok(true)
    }

    async fn remove_wishlist_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut s = self.state.lock().await;
        let before = s.wishlist.len();
        s.wishlist
            .retain(|w| !(w.user_id == user && w.product_id == product));
        Ok(s.wishlist.len() < before)
    }
}

/// An open in-memory transaction.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_cart(&mut self, owner: &OwnerKey) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.working.find_cart(owner).cloned())
    }

    async fn cart_lines(&mut self, cart: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        self.working.cart_lines(cart)
    }

    async fn find_address(
        &mut self,
        user: UserId,
        address: &ValidAddress,
    ) -> Result<Option<Address>, RepositoryError> {
        Ok(self
            .working
            .addresses
            .iter()
            .find(|a| a.user_id == Some(user) && a.fields.same_location(address))
            .cloned())
    }

    async fn insert_address(
        &mut self,
        user: Option<UserId>,
        address: &ValidAddress,
    ) -> Result<Address, RepositoryError> {
        Ok(self.working.insert_address(user, address, false))
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let created = Order {
            id: OrderId::new(self.working.next_id()),
            user_id: order.user_id,
            address_id: order.address_id,
            total: order.total,
            status: OrderStatus::Processing,
            status_changes: Vec::new(),
            created_at: order.created_at,
            updated_at: order.created_at,
        };
        self.working.orders.push(created.clone());
        Ok(created)
    }

    async fn insert_order_item(
        &mut self,
        item: &NewOrderItem,
    ) -> Result<OrderItem, RepositoryError> {
        let created = OrderItem {
            id: OrderItemId::new(self.working.next_id()),
            order_id: item.order_id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            price: item.price,
            discounted_price: item.discounted_price,
        };
        self.working.order_items.push(created.clone());
        Ok(created)
    }

    async fn record_product_sale(
        &mut self,
        product: ProductId,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> Result<Product, RepositoryError> {
        let qty = super::quantity_to_i32(quantity)?;
        let p = self
            .working
            .products
            .iter_mut()
            .find(|p| p.id == product)
            .ok_or(RepositoryError::NotFound)?;
        p.stock = (p.stock - qty).max(0);
        p.sold += qty;
        p.last_sold = Some(at);
        p.updated_at = at;
        Ok(p.clone())
    }

    async fn decrement_variant_stock(
        &mut self,
        variant: VariantId,
        quantity: u32,
    ) -> Result<ProductVariant, RepositoryError> {
        let qty = super::quantity_to_i32(quantity)?;
        let v = self
            .working
            .variants
            .iter_mut()
            .find(|v| v.id == variant)
            .ok_or(RepositoryError::NotFound)?;
        v.stock = (v.stock - qty).max(0);
        Ok(v.clone())
    }

    async fn clear_cart(
        &mut self,
        cart: CartId,
        items: &[CartItemId],
    ) -> Result<u64, RepositoryError> {
        let before = self.working.cart_items.len();
        self.working
            .cart_items
            .retain(|i| !(i.cart_id == cart && items.contains(&i.id)));
        Ok((before - self.working.cart_items.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
