//! # Auth API Handlers
//!
//! Login and token verification. Both routes are public; `verify` does its own
//! bearer parsing so it can tell a missing token from a rejected one.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{self, AuthUser, TokenService, extract_bearer_token};
use crate::error::{ApiError, bad_request, internal_error, unauthorized};
use crate::models::Role;
use crate::server::AppState;

/// Login credentials
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin@acme.test")]
    #[serde(default, deserialize_with = "super::non_blank")]
    pub email: Option<String>,
    #[schema(example = "password")]
    #[serde(default, deserialize_with = "super::non_blank")]
    pub password: Option<String>,
}

/// Identity carried by a session token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "admin@acme.test")]
    pub email: String,
    pub role: Role,
    #[schema(example = "acme")]
    pub tenant_slug: String,
}

impl From<AuthUser> for SessionUser {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            tenant_slug: user.tenant_slug,
        }
    }
}

/// Successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token, valid for the configured TTL
    pub token: String,
    pub user: SessionUser,
}

/// Exchange email and password for a session token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Email or password missing", body = ApiError),
        (status = 401, description = "Invalid credentials", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let (Some(email), Some(password)) = (request.email, request.password) else {
        return Err(bad_request("Email and password are required"));
    };

    let user = auth::authenticate(&state.store, email.trim(), &password).await?;
    let Some(user) = user else {
        counter!("auth_login_total", "outcome" => "failure").increment(1);
        tracing::info!("Login rejected");
        return Err(unauthorized(Some("Invalid credentials")));
    };

    let token = state.tokens.issue(&user).map_err(|e| {
        tracing::error!(error = %e, "Failed to sign session token");
        internal_error()
    })?;

    counter!("auth_login_total", "outcome" => "success").increment(1);
    tracing::info!(
        user_id = user.id,
        tenant = %user.tenant_slug,
        role = %user.role,
        "Login succeeded"
    );

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// Resolve a bearer token to the identity it carries
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Token is valid", body = SessionUser),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn verify(
    State(tokens): State<TokenService>,
    headers: HeaderMap,
) -> Result<Json<SessionUser>, ApiError> {
    let token = extract_bearer_token(&headers).map_err(|_| unauthorized(Some("No token provided")))?;

    let claims = tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Token verification failed");
        unauthorized(Some("Invalid token"))
    })?;

    Ok(Json(AuthUser::from(claims).into()))
}
