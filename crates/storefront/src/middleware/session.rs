//! Session middleware configuration.
//!
//! Production sessions live in `PostgreSQL` via `tower-sessions-sqlx-store`;
//! tests pass `tower_sessions::MemoryStore` to the same builder.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "lumen_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// `PostgreSQL` session store. Its table is created by [`PostgresStore::migrate`].
#[must_use]
pub fn postgres_session_store(pool: &PgPool) -> PostgresStore {
    PostgresStore::new(pool.clone())
}

/// Create the session layer around `store`.
///
/// # Arguments
///
/// * `store` - Session backend
/// * `secure` - Set the `Secure` cookie flag (the site is served over HTTPS)
#[must_use]
pub fn create_session_layer<S>(store: S, secure: bool) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
