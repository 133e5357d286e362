use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use health_manager_data::repository::RepositoryError;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Machine-readable validation failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    RequiredFieldMissing,
    ValueOutOfRange,
    InvalidFormat,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::RequiredFieldMissing => "REQUIRED_FIELD_MISSING",
            ValidationCode::ValueOutOfRange => "VALUE_OUT_OF_RANGE",
            ValidationCode::InvalidFormat => "INVALID_FORMAT",
        }
    }
}

/// A rejected input, pointing at the first offending field
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: Option<String>,
    pub message: String,
    pub code: ValidationCode,
}

impl ValidationError {
    pub fn new(field: Option<&str>, message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            field: field.map(String::from),
            message: message.into(),
            code,
        }
    }

    pub fn required(field: &str) -> Self {
        Self::new(Some(field), format!("{} is required", field), ValidationCode::RequiredFieldMissing)
    }

    pub fn out_of_range(field: &str, message: impl Into<String>) -> Self {
        Self::new(Some(field), message, ValidationCode::ValueOutOfRange)
    }

    pub fn invalid_format(field: &str, message: impl Into<String>) -> Self {
        Self::new(Some(field), message, ValidationCode::InvalidFormat)
    }

    /// Merge several failures into one error.
    /// The field and code come from the first failure, the messages are joined.
    pub fn combine(errors: Vec<ValidationError>) -> Option<ValidationError> {
        let first = errors.first()?.clone();
        let message = errors
            .iter()
            .map(|e| match &e.field {
                Some(field) => format!("{}: {}", field, e.message),
                None => e.message.clone(),
            })
            .collect::<Vec<String>>()
            .join("; ");

        Some(ValidationError { message, ..first })
    }
}

/// Authentication failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Authentication token has expired")]
    TokenExpired,

    #[error("Authentication token has been revoked")]
    TokenRevoked,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenRevoked => "TOKEN_REVOKED",
        }
    }
}

/// Application error returned by every domain service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Auth(_) => 401,
            AppError::NotFound(_) => 404,
            AppError::Forbidden(_) => 403,
            AppError::Conflict(_) => 409,
            AppError::Internal(_) => 500,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(e) => e.code(),
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Short error category used in the `error` field of responses
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Auth(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn validation(field: &str, message: impl Into<String>, code: ValidationCode) -> Self {
        AppError::Validation(ValidationError::new(Some(field), message, code))
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => AppError::NotFound(what),
            RepositoryError::Validation(msg) => {
                AppError::Validation(ValidationError::new(None, msg, ValidationCode::InvalidFormat))
            }
            RepositoryError::Duplicate(what) => AppError::Conflict(format!("{} already exists", what)),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ErrorResponse {
    /// Error category, e.g. `validation_error`
    pub error: String,

    /// Machine-readable code, e.g. `VALUE_OUT_OF_RANGE`
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// When the error was produced (RFC 3339)
    pub timestamp: String,

    /// Optional additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    #[serde(skip)]
    status: u16,
}

impl ErrorResponse {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        let message = match &err {
            AppError::Internal(detail) => {
                error!("Internal error: {}", detail);
                "An unexpected error occurred".to_string()
            }
            other => {
                warn!("Request failed with {}: {}", other.code(), other);
                other.to_string()
            }
        };

        let details = match &err {
            AppError::Validation(v) => Some(serde_json::json!({
                "field": v.field,
                "code": v.code.as_str(),
            })),
            _ => None,
        };

        ErrorResponse {
            error: err.kind().to_string(),
            code: err.code().to_string(),
            message,
            timestamp: Utc::now().to_rfc3339(),
            details,
            status: err.status_code(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_and_codes() {
        let cases = vec![
            (AppError::validation("value", "too high", ValidationCode::ValueOutOfRange), 400, "VALIDATION_ERROR"),
            (AppError::Auth(AuthError::TokenExpired), 401, "TOKEN_EXPIRED"),
            (AppError::NotFound("record".into()), 404, "NOT_FOUND"),
            (AppError::Forbidden("admin only".into()), 403, "FORBIDDEN"),
            (AppError::Conflict("email".into()), 409, "CONFLICT"),
            (AppError::Internal("boom".into()), 500, "INTERNAL_ERROR"),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_combine_keeps_first_field_and_code() {
        let combined = ValidationError::combine(vec![
            ValidationError::required("metric_type"),
            ValidationError::out_of_range("value", "must be between 40 and 200"),
        ])
        .unwrap();

        assert_eq!(combined.field.as_deref(), Some("metric_type"));
        assert_eq!(combined.code, ValidationCode::RequiredFieldMissing);
        assert_eq!(
            combined.message,
            "metric_type: metric_type is required; value: must be between 40 and 200"
        );
        assert!(ValidationError::combine(vec![]).is_none());
    }

    #[test]
    fn test_repository_errors_map_to_app_errors() {
        assert!(matches!(
            AppError::from(RepositoryError::Duplicate("email a@b.c".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::NotFound("record".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::Lock("poisoned".into())),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let response = ErrorResponse::from(AppError::Internal("db password wrong".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.message, "An unexpected error occurred");

        let response = ErrorResponse::from(AppError::validation(
            "value",
            "value must be between 40 and 200",
            ValidationCode::ValueOutOfRange,
        ));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.details.unwrap()["code"], "VALUE_OUT_OF_RANGE");
    }
}
