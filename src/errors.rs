//! # Error Handling for Entity Controllers
//!
//! Every controller action returns `Result<Response, ApiError>`. The error type
//! carries the HTTP status the action should answer with:
//!
//! - `Unauthorized` → 401, raised by entity and property authorization
//! - `NotFound` → 404, raised when an `id` does not match any entity
//! - `ValidationFailed` → 400, with the per-property error array
//! - `BadRequest` → 400, for malformed request values (e.g. a bad `id`)
//! - `Database`, `Template`, `Internal` → 500, details logged and never sent
//!
//! ## Logging
//!
//! Internal errors are logged using the `tracing` crate. To see them, install a
//! subscriber in your application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt()
//!     .with_target(false)
//!     .compact()
//!     .init();
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

use crate::validation::{ValidationError, ValidationErrors};

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - Entity doesn't exist
    NotFound {
        /// Entity type (e.g., "thread")
        resource: String,
        /// Optional ID that wasn't found
        id: Option<String>,
    },

    /// 400 Bad Request - Malformed request value
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 401 Unauthorized - Caller rejected by the entity policy
    Unauthorized {
        /// User-facing error message
        message: String,
    },

    /// 400 Bad Request - Update values failed validation
    ValidationFailed {
        /// Per-property validation errors
        errors: Vec<ValidationError>,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },

    /// 500 Internal Server Error - View rendering failed
    Template {
        /// Template being rendered
        template: String,
        /// Renderer error details (logged, not sent to user)
        internal: String,
    },

    /// 500 Internal Server Error - Generic internal error
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },
}

impl ApiError {
    /// Create a 404 Not Found error
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 401 Unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a 400 error carrying per-property validation errors
    #[must_use]
    pub fn validation_failed(errors: ValidationErrors) -> Self {
        Self::ValidationFailed {
            errors: errors.into_vec(),
        }
    }

    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    /// Create a 500 error for a failed view render
    pub fn template(template: impl Into<String>, internal: impl fmt::Display) -> Self {
        Self::Template {
            template: template.into(),
            internal: internal.to_string(),
        }
    }

    /// Create a 500 Internal Server Error with optional details
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } | Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Database { .. } | Self::Template { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// User-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::ValidationFailed { errors } => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                format!("Validation failed: {}", messages.join(", "))
            }
            Self::Template { .. } => "Failed to render view".to_string(),
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Template { template, internal } => {
                tracing::error!(template = %template, details = %internal, "View rendering failed");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        match self {
            Self::ValidationFailed { errors } => (status, Json(errors)).into_response(),
            other => (
                status,
                Json(ErrorResponse {
                    error: other.user_message(),
                }),
            )
                .into_response(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// Convert `SeaORM` `DbErr` to `ApiError`
///
/// - `DbErr::RecordNotFound` → 404 Not Found
/// - All other `DbErr` variants → 500 Internal Server Error
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::database(err),
        }
    }
}

impl From<handlebars::RenderError> for ApiError {
    fn from(err: handlebars::RenderError) -> Self {
        let template = err.template_name.clone().unwrap_or_default();
        Self::template(template, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_with_id() {
        let err = ApiError::not_found("thread", Some("123".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "thread with ID '123' not found");
    }

    #[test]
    fn test_not_found_without_id() {
        let err = ApiError::not_found("thread", None);
        assert_eq!(err.user_message(), "thread not found");
    }

    #[test]
    fn test_unauthorized() {
        let err = ApiError::unauthorized("Authentication required");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.user_message(), "Authentication required");
    }

    #[test]
    fn test_validation_failed_is_bad_request() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::new("title", "Title", "Title is required"));
        let err = ApiError::validation_failed(errors);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.user_message().contains("Title is required"));
    }

    #[test]
    fn test_database_error_is_sanitized() {
        let err = ApiError::database(DbErr::Type("Type mismatch error".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "A database error occurred");
    }

    #[test]
    fn test_template_error_is_sanitized() {
        let err = ApiError::template("Index", "missing partial");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Failed to render view");
    }

    #[test]
    fn test_dberr_record_not_found_becomes_404() {
        let api_err: ApiError = DbErr::RecordNotFound("thread not found".to_string()).into();
        assert_eq!(api_err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(api_err.user_message(), "thread not found");
    }

    #[test]
    fn test_all_other_dberr_become_500() {
        let test_cases = vec![
            DbErr::Custom("Any custom error".to_string()),
            DbErr::Type("Type error".to_string()),
            DbErr::Json("JSON error".to_string()),
        ];

        for db_err in test_cases {
            let api_err: ApiError = db_err.into();
            assert_eq!(api_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(api_err.user_message(), "A database error occurred");
        }
    }

    #[tokio::test]
    async fn test_validation_response_body_is_property_array() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::new("title", "Title", "Title is required"));
        let response = ApiError::validation_failed(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"Property": "title", "Name": "Title", "ErrorMessage": "Title is required"}
            ])
        );
    }

    #[test]
    fn test_display_trait() {
        let err = ApiError::bad_request("Test error");
        assert_eq!(format!("{err}"), "Test error");
    }
}
