//! Wishlists.
//!
//! Guests keep product ids in their session; signed-in users have persisted
//! rows. Both sit behind [`WishlistView`], picked per request by
//! [`wishlist_for`].

use std::collections::BTreeSet;

use async_trait::async_trait;

use lumen_core::{ProductId, UserId};

use crate::db::Store;
use crate::error::ShopError;

use super::identity::{RequestContext, SessionState};

/// Wishlist operations shared by guests and users.
#[async_trait]
pub trait WishlistView: Send + Sync {
    /// Product ids on the list.
    async fn ids(&self) -> Result<BTreeSet<ProductId>, ShopError>;

    /// Add (idempotent). `NotFound` if the product does not exist.
    async fn add(&self, product: ProductId) -> Result<(), ShopError>;

    /// Remove (idempotent). Returns whether it was present.
    async fn remove(&self, product: ProductId) -> Result<bool, ShopError>;

    /// Add if absent, remove if present. Returns whether it is now present.
    async fn toggle(&self, product: ProductId) -> Result<bool, ShopError> {
        if self.ids().await?.contains(&product) {
            self.remove(product).await?;
            Ok(false)
        } else {
            self.add(product).await?;
            Ok(true)
        }
    }

    async fn count(&self) -> Result<usize, ShopError> {
        Ok(self.ids().await?.len())
    }
}

/// Guest wishlist stored in the session.
pub struct SessionWishlist<'a> {
    store: &'a dyn Store,
    session: &'a dyn SessionState,
}

impl<'a> SessionWishlist<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, session: &'a dyn SessionState) -> Self {
        Self { store, session }
    }

    async fn load(&self) -> Result<Vec<ProductId>, ShopError> {
        self.session
            .guest_wishlist()
            .await
            .map_err(|e| session_failure(&e))
    }

    async fn save(&self, products: &[ProductId]) -> Result<(), ShopError> {
        self.session
            .store_guest_wishlist(products)
            .await
            .map_err(|e| session_failure(&e))
    }
}

fn session_failure(err: &super::identity::IdentityError) -> ShopError {
    tracing::error!(error = %err, "Wishlist session write failed");
    ShopError::Internal("Could not update wishlist")
}

#[async_trait]
impl WishlistView for SessionWishlist<'_> {
    async fn ids(&self) -> Result<BTreeSet<ProductId>, ShopError> {
        Ok(self.load().await?.into_iter().collect())
    }

    async fn add(&self, product: ProductId) -> Result<(), ShopError> {
        if self.store.product(product).await?.is_none() {
            return Err(ShopError::NotFound("Product"));
        }
        let mut products = self.load().await?;
        if !products.contains(&product) {
            products.push(product);
            self.save(&products).await?;
        }
        Ok(())
    }

    async fn remove(&self, product: ProductId) -> Result<bool, ShopError> {
        let mut products = self.load().await?;
        let before = products.len();
        products.retain(|p| *p != product);
        let removed = products.len() < before;
        if removed {
            self.save(&products).await?;
        }
        Ok(removed)
    }
}

/// Persisted wishlist of a signed-in user.
pub struct StoreWishlist<'a> {
    store: &'a dyn Store,
    user: UserId,
}

impl<'a> StoreWishlist<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, user: UserId) -> Self {
        Self { store, user }
    }
}

#[async_trait]
impl WishlistView for StoreWishlist<'_> {
    async fn ids(&self) -> Result<BTreeSet<ProductId>, ShopError> {
        let items = self.store.wishlist_items(self.user).await?;
        Ok(items.into_iter().map(|i| i.product_id).collect())
    }

    async fn add(&self, product: ProductId) -> Result<(), ShopError> {
        if self.store.product(product).await?.is_none() {
            return Err(ShopError::NotFound("Product"));
        }
        if self.store.add_wishlist_item(self.user, product).await? {
            tracing::debug!(user_id = %self.user, product_id = %product, "Wishlist item added");
        }
        Ok(())
    }

    async fn remove(&self, product: ProductId) -> Result<bool, ShopError> {
        Ok(self.store.remove_wishlist_item(self.user, product).await?)
    }
}

/// The wishlist for the caller: persisted for users, session-backed for guests.
#[must_use]
pub fn wishlist_for<'a>(
    store: &'a dyn Store,
    session: &'a dyn SessionState,
    ctx: &RequestContext,
) -> Box<dyn WishlistView + 'a> {
    match ctx.user_id() {
        Some(user) => Box::new(StoreWishlist::new(store, user)),
        None => Box::new(SessionWishlist::new(store, session)),
    }
}
