//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `checkout_rate_limiter`: strict limits for order placement and reviews (~12/min)
//! - `api_rate_limiter`: relaxed limits for the rest of the API (~100/min)

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Proxy headers carrying the client IP, most trusted first.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Key extractor reading the client IP from proxy headers.
///
/// For `X-Forwarded-For` the first address in the chain is used.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientIpKeyExtractor;

/// First parseable client IP in `headers`.
fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req.headers()).ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiters applied by the router.
#[derive(Clone)]
pub struct RateLimits {
    /// Order placement and review submission.
    pub checkout: RateLimiterLayer,
    /// Everything else under `/api`.
    pub api: RateLimiterLayer,
}

impl RateLimits {
    /// The production limits.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            checkout: checkout_rate_limiter(),
            api: api_rate_limiter(),
        }
    }
}

/// Create rate limiter for checkout: ~12 requests per minute per IP.
///
/// Configuration: 1 request every 5 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. `per_second(5)` and `burst_size(5)` are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn checkout_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(5)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(5) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for the general API: ~60 requests per minute per IP.
///
/// Configuration: 1 request per second (replenish), burst of 50.
///
/// # Panics
///
/// This function will not panic. `per_second(1)` and `burst_size(50)` are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}
