//! # Error Handling
//!
//! This module provides unified error handling for the notes API. Every failure
//! leaves a handler as an [`ApiError`], rendered as a JSON body carrying an `error`
//! message, a machine-readable `code`, and the request trace ID.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Human-readable error message
    pub error: Box<str>,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code, code and message
    pub fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            error: message.into(),
            code: code.into(),
            details: None,
            trace_id: telemetry::current_trace_id().map(String::into_boxed_str),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }
}

/// Standard error types with predefined status codes
#[derive(Debug, Error)]
pub enum ErrorType {
    #[error("Bad Request")]
    BadRequest,
    #[error("Authentication required")]
    Unauthorized,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("Not Found")]
    NotFound,
    #[error("Conflict")]
    Conflict,
    #[error("Internal server error")]
    InternalServerError,
}

impl ErrorType {
    /// Get the appropriate HTTP status code for this error type
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorType::Forbidden => StatusCode::FORBIDDEN,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorType::BadRequest => "VALIDATION_FAILED",
            ErrorType::Unauthorized => "UNAUTHORIZED",
            ErrorType::Forbidden => "FORBIDDEN",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::Conflict => "CONFLICT",
            ErrorType::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Errors raised by the persistence store and repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("free plan limited to {limit} notes")]
    PlanLimitReached { limit: usize },
    #[error("password hashing failed: {0}")]
    Password(String),
}

impl RepositoryError {
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self)).into_response()
    }
}

impl From<ErrorType> for ApiError {
    fn from(error_type: ErrorType) -> Self {
        Self::new(
            error_type.status_code(),
            error_type.error_code(),
            &error_type.to_string(),
        )
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);
        internal_error()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err.body_text()),
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(message) => not_found(&message),
            RepositoryError::Conflict(message) => conflict(&message),
            RepositoryError::PlanLimitReached { limit } => plan_limit_reached(limit),
            RepositoryError::Password(detail) => {
                tracing::error!(error = %detail, "Password hashing failed");
                internal_error()
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::TokenInvalid(_) | AuthError::TokenExpired => unauthorized(None),
            AuthError::InsufficientPermissions { .. } => forbidden(None),
            AuthError::Crypto(detail) => {
                tracing::error!(error = %detail, "Credential processing failed");
                internal_error()
            }
        }
    }
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create a forbidden error (403)
pub fn forbidden(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Insufficient permissions");
    ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg)
}

/// Create a not found error (404)
pub fn not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

/// Create a conflict error (409)
pub fn conflict(message: &str) -> ApiError {
    ApiError::new(StatusCode::CONFLICT, "CONFLICT", message)
}

/// Create a validation error (400)
pub fn bad_request(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
}

/// Free-plan note cap reached (403). Clients branch on `PLAN_LIMIT_REACHED` to offer an upgrade.
pub fn plan_limit_reached(limit: usize) -> ApiError {
    ApiError::new(
        StatusCode::FORBIDDEN,
        "PLAN_LIMIT_REACHED",
        &format!("Free plan limited to {limit} notes. Please upgrade to Pro."),
    )
    .with_details(serde_json::json!({ "limit": limit, "subscription_plan": "free" }))
}

/// Generic 500. Internal detail is logged by the caller, never returned.
pub fn internal_error() -> ApiError {
    ErrorType::InternalServerError.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_basic() {
        let error = ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Test error message",
        );

        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.error, Box::from("Test error message"));
        assert_eq!(error.details, None);
    }

    #[test]
    fn test_api_error_body_has_error_field() {
        let error = not_found("Note not found");
        let body = serde_json::to_value(&error).unwrap();

        assert_eq!(body["error"], "Note not found");
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body.get("status").is_none());
    }

    #[test]
    fn test_error_type_mapping() {
        let error: ApiError = ErrorType::Unauthorized.into();
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
        assert_eq!(error.code, Box::from("UNAUTHORIZED"));
        assert_eq!(error.error, Box::from("Authentication required"));
    }

    #[test]
    fn test_from_anyhow_hides_detail() {
        let api_error: ApiError = anyhow::anyhow!("disk on fire at /var/data").into();

        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.error, Box::from("Internal server error"));
    }

    #[test]
    fn test_plan_limit_is_distinguishable() {
        let error: ApiError = RepositoryError::PlanLimitReached { limit: 3 }.into();

        assert_eq!(error.status, StatusCode::FORBIDDEN);
        assert_eq!(error.code, Box::from("PLAN_LIMIT_REACHED"));
        assert_eq!(
            error.error,
            Box::from("Free plan limited to 3 notes. Please upgrade to Pro.")
        );
        assert_eq!(error.details, Some(Box::new(json!({"limit": 3, "subscription_plan": "free"}))));
    }

    #[test]
    fn test_repository_error_mapping() {
        let conflict: ApiError = RepositoryError::Conflict("taken".to_string()).into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let missing: ApiError = RepositoryError::not_found("Tenant not found").into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.error, Box::from("Tenant not found"));

        let password: ApiError = RepositoryError::Password("salt".to_string()).into();
        assert_eq!(password.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(password.error, Box::from("Internal server error"));
    }

    #[test]
    fn test_auth_error_mapping() {
        let expired: ApiError = AuthError::TokenExpired.into();
        assert_eq!(expired.status, StatusCode::UNAUTHORIZED);

        let denied: ApiError = AuthError::InsufficientPermissions {
            role: crate::models::Role::Member,
        }
        .into();
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
        assert_eq!(denied.error, Box::from("Insufficient permissions"));
    }
}
