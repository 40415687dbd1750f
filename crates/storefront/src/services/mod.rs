//! Business logic services for storefront.
//!
//! # Services
//!
//! - `identity` - Resolve the caller to a user or guest owner key
//! - `cart` - Cart lines, quantities and totals
//! - `checkout` - Turn a cart into an order in one transaction
//! - `orders` - Order status machine and order reads
//! - `reviews` - Product reviews and rating summaries
//! - `wishlist` - Session- and store-backed wishlists
//! - `addresses` - Address book
//! - `catalog` - Product listing and catalog writes
//!
//! Services borrow a `&dyn Store` and are cheap to build per request.

pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod identity;
pub mod orders;
pub mod reviews;
pub mod wishlist;

pub use addresses::AddressService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use identity::{IdentityError, RequestContext, SessionState, resolve};
pub use orders::OrderService;
pub use reviews::ReviewService;
pub use wishlist::{SessionWishlist, StoreWishlist, WishlistView, wishlist_for};
