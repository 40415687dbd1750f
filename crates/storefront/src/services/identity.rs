//! Identity resolution.
//!
//! Every core operation receives an explicit [`RequestContext`] rather than
//! reaching into the session itself. The session is only touched here, through
//! the [`SessionState`] contract.

use async_trait::async_trait;
use tower_sessions::Session;

use lumen_core::{OrderId, OwnerKey, ProductId, SessionKey, UserId};

use crate::models::{CurrentUser, session_keys};

/// Errors reading or writing session state.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A stored guest key failed validation.
    #[error("invalid guest key in session")]
    InvalidGuestKey,
}

/// What the storefront needs from a session provider.
#[async_trait]
pub trait SessionState: Send + Sync {
    /// The signed-in user, if any.
    async fn current_user(&self) -> Result<Option<CurrentUser>, IdentityError>;

    /// The guest key, generating and storing one when absent and asked to.
    async fn session_key(
        &self,
        create_if_absent: bool,
    ) -> Result<Option<SessionKey>, IdentityError>;

    /// The order most recently placed as a guest in this session.
    async fn guest_order(&self) -> Result<Option<OrderId>, IdentityError>;

    async fn remember_guest_order(&self, order: OrderId) -> Result<(), IdentityError>;

    /// Guest wishlist product ids, in insertion order.
    async fn guest_wishlist(&self) -> Result<Vec<ProductId>, IdentityError>;

    async fn store_guest_wishlist(&self, products: &[ProductId]) -> Result<(), IdentityError>;
}

#[async_trait]
impl SessionState for Session {
    async fn current_user(&self) -> Result<Option<CurrentUser>, IdentityError> {
        Ok(self.get(session_keys::CURRENT_USER).await?)
    }

    async fn session_key(
        &self,
        create_if_absent: bool,
    ) -> Result<Option<SessionKey>, IdentityError> {
        if let Some(stored) = self.get::<String>(session_keys::GUEST_KEY).await? {
            return SessionKey::new(stored)
                .map(Some)
                .ok_or(IdentityError::InvalidGuestKey);
        }
        if !create_if_absent {
            return Ok(None);
        }
        let key = SessionKey::generate();
        self.insert(session_keys::GUEST_KEY, key.as_str()).await?;
        tracing::debug!("Generated guest key");
        Ok(Some(key))
    }

    async fn guest_order(&self) -> Result<Option<OrderId>, IdentityError> {
        Ok(self.get(session_keys::GUEST_ORDER_ID).await?)
    }

    async fn remember_guest_order(&self, order: OrderId) -> Result<(), IdentityError> {
        self.insert(session_keys::GUEST_ORDER_ID, order).await?;
        Ok(())
    }

    async fn guest_wishlist(&self) -> Result<Vec<ProductId>, IdentityError> {
        Ok(self
            .get(session_keys::WISHLIST)
            .await?
            .unwrap_or_default())
    }

    async fn store_guest_wishlist(&self, products: &[ProductId]) -> Result<(), IdentityError> {
        self.insert(session_keys::WISHLIST, products).await?;
        Ok(())
    }
}

/// The resolved identity of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Signed-in user, if any.
    pub user: Option<CurrentUser>,
    /// Key carts are stored under.
    pub owner: OwnerKey,
}

impl RequestContext {
    /// Context for a signed-in user.
    #[must_use]
    pub fn for_user(user: CurrentUser) -> Self {
        let owner = OwnerKey::User(user.id);
        Self {
            user: Some(user),
            owner,
        }
    }

    /// Context for a guest.
    #[must_use]
    pub const fn for_guest(key: SessionKey) -> Self {
        Self {
            user: None,
            owner: OwnerKey::Session(key),
        }
    }

    /// The signed-in user's id.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }

    #[must_use]
    pub const fn is_guest(&self) -> bool {
        self.user.is_none()
    }
}

/// Resolve the identity of the caller.
///
/// A signed-in user wins. Otherwise the guest key is read, and created only
/// when missing.
///
/// # Errors
///
/// Returns [`IdentityError`] if the session cannot be read or written.
pub async fn resolve(session: &dyn SessionState) -> Result<RequestContext, IdentityError> {
    if let Some(user) = session.current_user().await? {
        return Ok(RequestContext::for_user(user));
    }
    let key = session
        .session_key(true)
        .await?
        .ok_or(IdentityError::InvalidGuestKey)?;
    Ok(RequestContext::for_guest(key))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use lumen_core::Email;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_guest_key_is_stable() {
        let session = session();
        let first = resolve(&session).await.unwrap();
        let second = resolve(&session).await.unwrap();

        assert!(first.is_guest());
        assert_eq!(first.owner, second.owner);
    }

    #[tokio::test]
    async fn test_session_key_not_created_when_not_asked() {
        let session = session();
        assert_eq!(session.session_key(false).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_signed_in_user_wins() {
        let session = session();
        session.session_key(true).await.unwrap();
        let user = CurrentUser {
            id: UserId::new(7),
            email: Email::parse("ada@example.com").unwrap(),
            is_staff: false,
        };
        session
            .insert(session_keys::CURRENT_USER, &user)
            .await
            .unwrap();

        let ctx = resolve(&session).await.unwrap();
        assert_eq!(ctx.owner, OwnerKey::User(UserId::new(7)));
        assert_eq!(ctx.user_id(), Some(UserId::new(7)));
    }

    #[tokio::test]
    async fn test_guest_order_round_trips() {
        let session = session();
        assert_eq!(session.guest_order().await.unwrap(), None);
        session.remember_guest_order(OrderId::new(42)).await.unwrap();
        assert_eq!(session.guest_order().await.unwrap(), Some(OrderId::new(42)));
    }
}
