//! Cart and wishlist ownership.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::UserId;

/// Opaque key identifying a guest browsing session.
///
/// Generated once per guest and stored in their session cookie so follow-up
/// requests resolve to the same cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Maximum stored length, matching the `carts.session_key` column.
    pub const MAX_LENGTH: usize = 40;

    /// Generate a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an existing key, rejecting empty or oversized values.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() || key.len() > Self::MAX_LENGTH {
            return None;
        }
        Some(Self(key))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity a cart is keyed by: exactly one of a user or a guest session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerKey {
    /// Authenticated user.
    User(UserId),
    /// Guest identified by their session key.
    Session(SessionKey),
}

impl OwnerKey {
    /// The user id, if this owner is authenticated.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Session(_) => None,
        }
    }

    /// The session key, if this owner is a guest.
    #[must_use]
    pub const fn session_key(&self) -> Option<&SessionKey> {
        match self {
            Self::User(_) => None,
            Self::Session(key) => Some(key),
        }
    }

    /// Whether this owner is a guest.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Session(key) => write!(f, "session:{key}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_fit_column() {
        let key = SessionKey::generate();
        assert_eq!(key.as_str().len(), 32);
        assert!(SessionKey::new(key.as_str()).is_some());
        assert_ne!(key, SessionKey::generate());
    }

    #[test]
    fn test_new_rejects_empty_and_oversized() {
        assert!(SessionKey::new("").is_none());
        assert!(SessionKey::new("k".repeat(41)).is_none());
    }

    #[test]
    fn test_owner_accessors() {
        let user = OwnerKey::User(UserId::new(3));
        assert_eq!(user.user_id(), Some(UserId::new(3)));
        assert!(!user.is_guest());

        let guest = OwnerKey::Session(SessionKey::new("abc").unwrap());
        assert_eq!(guest.user_id(), None);
        assert_eq!(guest.session_key().map(SessionKey::as_str), Some("abc"));
        assert_eq!(guest.to_string(), "session:abc");
    }
}
