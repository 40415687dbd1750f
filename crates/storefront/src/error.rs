//! Unified error handling with Sentry integration.
//!
//! Services return [`ShopError`]. Route handlers return `Result<T, AppError>`,
//! which captures server errors to Sentry before responding to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use lumen_core::{AddressError, RatingError, StatusError};

use crate::db::RepositoryError;
use crate::services::identity::IdentityError;

/// Domain failures surfaced by the services.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Input failed validation. `fields` names the offending inputs.
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<String>,
    },

    /// Checkout was attempted with no cart or no lines.
    #[error("Your cart is empty")]
    EmptyCart,

    /// A referenced entity does not exist or is not visible to the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unknown status or disallowed transition.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// The user already reviewed this product.
    #[error("You have already reviewed this product")]
    DuplicateReview,

    /// Generic failure; the cause has already been logged.
    #[error("{0}")]
    Internal(&'static str),

    /// Storage failure.
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl ShopError {
    /// A validation error with no specific field.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// A validation error for one field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: vec![field.to_owned()],
        }
    }

    /// Whether this is a server-side failure rather than a client error.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Internal(_) | Self::Repository(_))
    }
}

impl From<RepositoryError> for ShopError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Record"),
            other => Self::Repository(other),
        }
    }
}

impl From<AddressError> for ShopError {
    fn from(err: AddressError) -> Self {
        let fields = match &err {
            AddressError::Missing(fields) => fields.iter().map(|f| (*f).to_owned()).collect(),
            AddressError::TooLong { field, .. } => vec![(*field).to_owned()],
            AddressError::InvalidEmail(_) => vec!["email".to_owned()],
        };
        Self::Validation {
            message: err.to_string(),
            fields,
        }
    }
}

impl From<StatusError> for ShopError {
    fn from(err: StatusError) -> Self {
        Self::InvalidStatus(err.to_string())
    }
}

impl From<RatingError> for ShopError {
    fn from(err: RatingError) -> Self {
        Self::invalid_field("rating", err.to_string())
    }
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Service failure.
    #[error(transparent)]
    Shop(#[from] ShopError),

    /// Session read or write failed.
    #[error("Session error: {0}")]
    Identity(#[from] IdentityError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::Shop(err.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<String>,
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Shop(err) => err.is_server_error(),
            Self::Identity(_) | Self::Internal(_) => true,
            _ => false,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Shop(err) => match err {
                ShopError::Validation { .. } => StatusCode::BAD_REQUEST,
                ShopError::EmptyCart | ShopError::DuplicateReview | ShopError::InvalidStatus(_) => {
                    StatusCode::CONFLICT
                }
                ShopError::NotFound(_) => StatusCode::NOT_FOUND,
                ShopError::Internal(_) | ShopError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Identity(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Shop(ShopError::Internal(message)) => ErrorBody {
                error: message.to_owned(),
                fields: Vec::new(),
            },
            Self::Shop(ShopError::Validation { message, fields }) => ErrorBody {
                error: message,
                fields,
            },
            err if err.is_server_error() => ErrorBody {
                error: "Internal server error".to_owned(),
                fields: Vec::new(),
            },
            Self::Shop(err) => ErrorBody {
                error: err.to_string(),
                fields: Vec::new(),
            },
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => ErrorBody {
                error: msg,
                fields: Vec::new(),
            },
            Self::Identity(_) | Self::Internal(_) => ErrorBody {
                error: "Internal server error".to_owned(),
                fields: Vec::new(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after resolving an authenticated user to associate errors with them.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::from(ShopError::NotFound("Order"));
        assert_eq!(err.to_string(), "Order not found");
    }

    #[test]
    fn test_shop_error_status_codes() {
        assert_eq!(
            get_status(ShopError::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(ShopError::EmptyCart), StatusCode::CONFLICT);
        assert_eq!(get_status(ShopError::DuplicateReview), StatusCode::CONFLICT);
        assert_eq!(
            get_status(ShopError::InvalidStatus("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ShopError::NotFound("Product")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ShopError::Internal("Checkout failed")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let err = ShopError::from(RepositoryError::NotFound);
        assert!(matches!(err, ShopError::NotFound(_)));
    }

    #[test]
    fn test_address_error_names_fields() {
        let err = ShopError::from(AddressError::Missing(vec!["city", "phone"]));
        let ShopError::Validation { fields, .. } = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields, vec!["city".to_owned(), "phone".to_owned()]);
    }
}
