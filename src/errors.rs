//! # Error Handling
//!
//! Two layers:
//!
//! - [`RepositoryError`] is what repository operations signal: the domain
//!   conditions (not found, conflict, validation) plus any other database
//!   error, passed through untouched.
//! - [`ApiError`] is what route handlers return. It maps each domain
//!   condition to its HTTP status and renders a JSON body:
//!
//! ```json
//! {"error": "Validation failed", "details": ["name: unknown field"]}
//! ```
//!
//! Database errors become `500` with a generic message; the underlying
//! `DbErr` is logged through `tracing` and never sent to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;

use crate::validation::ValidationErrors;

/// Failure of a repository operation.
#[derive(Debug)]
pub enum RepositoryError {
    /// No row for the given key
    NotFound { resource: String, key: String },
    /// The row would duplicate an existing primary key or unique value
    Conflict { resource: String, message: String },
    /// Input rejected before reaching the database
    Validation(ValidationErrors),
    /// Anything else the database layer reported
    Database(DbErr),
}

impl RepositoryError {
    pub fn not_found(resource: impl Into<String>, key: impl fmt::Display) -> Self {
        Self::NotFound {
            resource: resource.into(),
            key: key.to_string(),
        }
    }

    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Classify a database error raised while writing `resource`.
    ///
    /// Unique-constraint violations become [`RepositoryError::Conflict`];
    /// everything else is kept as [`RepositoryError::Database`].
    #[must_use]
    pub fn from_write(resource: &str, err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::conflict(resource, detail),
            _ => Self::Database(err),
        }
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { resource, key } => write!(f, "{resource} '{key}' not found"),
            Self::Conflict { resource, message } => write!(f, "{resource} conflict: {message}"),
            Self::Validation(errors) => write!(f, "{errors}"),
            Self::Database(err) => write!(f, "database error: {err}"),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbErr> for RepositoryError {
    fn from(err: DbErr) -> Self {
        Self::Database(err)
    }
}

impl From<ValidationErrors> for RepositoryError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found
    NotFound {
        /// Resource type (e.g., "items")
        resource: String,
        /// Key that wasn't found, as it appeared in the path
        key: Option<String>,
    },

    /// 409 Conflict - duplicate key or unique value
    Conflict {
        /// User-facing error message
        message: String,
    },

    /// 422 Unprocessable Entity - Validation failed
    ValidationFailed {
        /// User-facing validation errors
        errors: Vec<String>,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },

    /// Error with a caller-chosen status, e.g. a body rejection from axum
    Custom {
        status: StatusCode,
        message: String,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, key: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            key,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
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

    pub fn custom(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Custom {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Custom { status, .. } => *status,
        }
    }

    /// Get the user-facing error message (sanitized)
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, key } => match key {
                Some(key) => format!("{resource} '{key}' not found"),
                None => format!("{resource} not found"),
            },
            Self::ValidationFailed { errors } => {
                if errors.len() == 1 {
                    errors[0].clone()
                } else {
                    format!("Validation failed: {}", errors.join(", "))
                }
            }
            Self::Conflict { message }
            | Self::Database { message, .. }
            | Self::Custom { message, .. } => message.clone(),
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
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
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorResponse {
                error: self.user_message(),
                details: None,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_failed(errors.messages())
    }
}

/// `NotFound` → 404, `Conflict` → 409, `Validation` → 422, `Database` → 500.
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { resource, key } => Self::not_found(resource, Some(key)),
            RepositoryError::Conflict { resource, message } => {
                Self::conflict(format!("{resource} already exists: {message}"))
            }
            RepositoryError::Validation(errors) => errors.into(),
            RepositoryError::Database(err) => Self::database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn test_not_found_with_key() {
        let err = ApiError::not_found("items", Some("5/7".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "items '5/7' not found");
    }

    #[test]
    fn test_not_found_without_key() {
        let err = ApiError::not_found("items", None);
        assert_eq!(err.user_message(), "items not found");
    }

    #[test]
    fn test_validation_failed_single_error() {
        let err = ApiError::validation_failed(vec!["name: unknown field".to_string()]);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.user_message(), "name: unknown field");
    }

    #[test]
    fn test_validation_failed_multiple_errors() {
        let err = ApiError::validation_failed(vec!["a: bad".to_string(), "b: worse".to_string()]);
        assert_eq!(err.user_message(), "Validation failed: a: bad, b: worse");
    }

    #[test]
    fn test_database_error_is_sanitized() {
        let err = ApiError::database(DbErr::Custom("SELECT secret FROM users".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "A database error occurred");
        assert!(!err.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_server_errors_only_come_from_the_database() {
        let err = ApiError::database(DbErr::Custom("SELECT secret FROM users".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, serde_json::json!({"error": "A database error occurred"}));
    }

    #[test]
    fn test_repository_error_mapping() {
        let cases = vec![
            (RepositoryError::not_found("items", 1), StatusCode::NOT_FOUND),
            (RepositoryError::conflict("items", "id"), StatusCode::CONFLICT),
            (
                RepositoryError::Validation(ValidationError::new("id", "bad").into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                RepositoryError::Database(DbErr::Custom("boom".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn test_non_constraint_write_error_stays_database() {
        let err = RepositoryError::from_write("items", DbErr::Custom("disk full".to_string()));
        assert!(matches!(err, RepositoryError::Database(_)));
    }

    #[test]
    fn test_custom_status_is_kept() {
        let err = ApiError::custom(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected JSON");
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.to_string(), "Expected JSON");
    }
}
