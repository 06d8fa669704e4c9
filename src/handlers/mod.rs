//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the notes API.

use crate::error::{ApiError, not_found};
use crate::models::{HealthStatus, ServiceInfo};
use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Deserializer};

pub mod auth;
pub mod notes;
pub mod payments;
pub mod tenants;
pub mod users;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthStatus)
    ),
    tag = "root"
)]
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}

/// Unknown paths.
pub async fn fallback() -> ApiError {
    not_found("Not found")
}

/// Known paths hit with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "METHOD_NOT_ALLOWED",
        "Method not allowed",
    )
}

/// Reads an optional request field that must be a non-blank string.
///
/// Absent, `null`, non-string and whitespace-only values all come back as `None`,
/// so handlers report them with one "required" message.
pub(crate) fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(text)) if !text.trim().is_empty() => Some(text),
        _ => None,
    })
}
