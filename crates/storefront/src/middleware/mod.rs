//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded in the span and Sentry scope)
//! 4. Security headers
//! 5. Session layer (tower-sessions)
//! 6. Rate limiting (governor), per route group

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, Caller, OptionalAuth, RequireAuth, RequireStaff, clear_current_user,
    set_current_user,
};
pub use rate_limit::{RateLimits, api_rate_limiter, checkout_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, postgres_session_store};
