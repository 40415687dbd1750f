//! Domain models for storefront.
//!
//! Validated domain objects, separate from the database row types in
//! [`crate::db`].

pub mod cart;
pub mod catalog;
pub mod order;
pub mod review;
pub mod session;
pub mod wishlist;

pub use cart::{
    Cart, CartAction, CartItem, CartItemChange, CartLine, CartLineView, CartUpdate, CartView,
    MAX_LINE_QUANTITY, cart_total, item_count,
};
pub use catalog::{
    Brand, Category, NewBrand, NewCategory, NewProduct, NewTag, NewVariant, PAGE_SIZE, Page,
    Product, ProductDetail, ProductFilter, ProductSort, ProductVariant, Tag,
};
pub use order::{
    AccountOrders, Address, NewOrder, NewOrderItem, Order, OrderDetail, OrderFilter, OrderItem,
    OrderListing, StatusChange,
};
pub use review::{NewReview, RatingSummary, Review};
pub use session::{CurrentUser, keys as session_keys};
pub use wishlist::WishlistItem;
