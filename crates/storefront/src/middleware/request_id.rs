//! Request ID middleware for request tracing and correlation.
//!
//! Reuses an upstream `x-request-id` when it looks sane, otherwise generates a
//! UUID v4. The id is recorded in the current span, tagged on the Sentry
//! scope, stored in request extensions and echoed in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id accepted as-is.
const MAX_UPSTREAM_ID_LENGTH: usize = 128;

/// The id of the current request, available as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

fn upstream_id(request: &Request) -> Option<String> {
    let value = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let value = value.trim();
    let acceptable = !value.is_empty()
        && value.len() <= MAX_UPSTREAM_ID_LENGTH
        && value.bytes().all(|b| b.is_ascii_graphic());
    acceptable.then(|| value.to_owned())
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = upstream_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request(id: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/");
        if let Some(id) = id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_upstream_id_accepted() {
        assert_eq!(upstream_id(&request(Some("abc-123"))).as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_upstream_id_rejected() {
        assert_eq!(upstream_id(&request(None)), None);
        assert_eq!(upstream_id(&request(Some("   "))), None);
        assert_eq!(upstream_id(&request(Some("has space"))), None);
        assert_eq!(upstream_id(&request(Some(&"x".repeat(200)))), None);
    }
}
