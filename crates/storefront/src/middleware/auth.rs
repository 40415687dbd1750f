//! Authentication extractors.
//!
//! Sign-in itself happens elsewhere; these extractors only read the identity
//! the session carries.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::services::identity::{self, RequestContext, SessionState};

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in staff user.
pub struct RequireStaff(pub CurrentUser);

/// Error returned when a request lacks the required identity.
#[derive(Debug)]
pub enum AuthRejection {
    /// No session layer, or nobody signed in.
    Unauthorized,
    /// Signed in, but not staff.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Sign in required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Staff access required"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    match session.current_user().await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read current user from session");
            None
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await
            .ok_or(AuthRejection::Unauthorized)?;
        set_sentry_user(&user.id, Some(user.email.as_str()));
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_staff {
            tracing::warn!(user_id = %user.id, "Non-staff user attempted admin action");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// The resolved caller: identity plus the session it came from.
///
/// Resolving creates a guest key on first use, so handlers that only read
/// should prefer [`OptionalAuth`].
pub struct Caller {
    pub ctx: RequestContext,
    pub session: Session,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;
        let ctx = identity::resolve(&session).await?;
        if let Some(user) = &ctx.user {
            set_sentry_user(&user.id, Some(user.email.as_str()));
        }
        Ok(Self { ctx, session })
    }
}

/// Helper to set the current user in the session.
///
/// The guest key is kept so a cart started as a guest is still reachable
/// after sign-out.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    crate::error::clear_sentry_user();
    Ok(())
}
