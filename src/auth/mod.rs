//! # Authentication and Authorization
//!
//! Bearer-token identity resolution, the middleware that guards protected routes,
//! and role checks used by handlers.

pub mod password;
pub mod service;
pub mod token;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use thiserror::Error;

use crate::error::{ApiError, unauthorized};
use crate::models::Role;
use crate::server::AppState;

pub use service::authenticate;
pub use token::{SessionClaims, TokenService};

/// Credential, token and permission failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token invalid: {0}")]
    TokenInvalid(String),
    #[error("token expired")]
    TokenExpired,
    #[error("crypto failure: {0}")]
    Crypto(String),
    #[error("role '{role}' is not permitted")]
    InsufficientPermissions { role: Role },
}

/// Why a bearer token could not be read from the request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerError {
    Missing,
    Malformed,
}

/// The authenticated caller, as carried by the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub tenant_id: i64,
    pub tenant_slug: String,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.tokens.clone()
    }
}

/// Read the token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, BearerError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(BearerError::Missing)?
        .to_str()
        .map_err(|_| BearerError::Malformed)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(BearerError::Malformed)
}

/// Resolve the caller's identity. Any failure (absent or malformed header, bad
/// signature, expiry) yields `None`.
pub fn resolve_identity(headers: &HeaderMap, tokens: &TokenService) -> Option<AuthUser> {
    let token = extract_bearer_token(headers).ok()?;
    match tokens.verify(token) {
        Ok(claims) => Some(claims.into()),
        Err(err) => {
            tracing::debug!(error = %err, "Rejected bearer token");
            None
        }
    }
}

/// Rejects requests without a valid session token with 401; otherwise stores the
/// [`AuthUser`] in request extensions for handlers.
pub async fn auth_middleware(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_identity(request.headers(), &tokens).ok_or_else(|| unauthorized(None))?;

    tracing::debug!(
        user_id = user.id,
        tenant_id = user.tenant_id,
        role = %user.role,
        "Authenticated request"
    );

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Fails with [`AuthError::InsufficientPermissions`] unless the caller's role is allowed.
pub fn require_role(user: &AuthUser, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermissions { role: user.role })
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| unauthorized(None))
    }
}
