//! # Users API Handlers

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthError, AuthUser, password::hash_password, require_role};
use crate::error::{ApiError, bad_request, conflict, forbidden};
use crate::models::Role;
use crate::repositories::{CreateUserRequest, UserRepository};
use crate::server::AppState;

const TEMP_PASSWORD_LEN: usize = 8;

/// Invitation for a new user in the caller's tenant
#[derive(Debug, Deserialize, ToSchema)]
pub struct InviteRequest {
    #[schema(example = "new.hire@acme.test")]
    #[serde(default, deserialize_with = "super::non_blank")]
    pub email: Option<String>,
    /// `admin` or `member`
    #[schema(example = "member")]
    #[serde(default, deserialize_with = "super::non_blank")]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvitedUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    /// One-time password to hand to the invitee
    #[serde(rename = "tempPassword")]
    pub temp_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InviteResponse {
    #[schema(example = "User invited successfully")]
    pub message: String,
    pub user: InvitedUser,
}

fn generate_temp_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Invite a user into the caller's tenant
#[utoipa::path(
    post,
    path = "/api/users/invite",
    security(("bearer_auth" = [])),
    request_body = InviteRequest,
    responses(
        (status = 201, description = "User created with a temporary password", body = InviteResponse),
        (status = 400, description = "Missing fields, invalid email or role", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Caller is not an admin", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "users"
)]
pub async fn invite_user(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<InviteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InviteResponse>), ApiError> {
    require_role(&user, &[Role::Admin]).map_err(|_| forbidden(Some("Only admins can invite users")))?;

    let Json(request) = payload?;
    let (Some(email), Some(role)) = (request.email, request.role) else {
        return Err(bad_request("Email and role are required"));
    };
    let role: Role = role
        .parse()
        .map_err(|_| bad_request("Role must be either admin or member"))?;
    let email = email.trim().to_string();
    if !email.contains('@') {
        return Err(bad_request("Invalid email address"));
    }

    let users = UserRepository::new(&state.store);
    if users.get_by_email(&email).await.is_some() {
        return Err(conflict("User with this email already exists"));
    }

    let temp_password = generate_temp_password();
    let candidate = temp_password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&candidate))
        .await
        .map_err(|e| AuthError::Crypto(format!("password hashing task failed: {e}")))??;

    let invited = users
        .create_user(CreateUserRequest {
            email,
            password_hash,
            role,
            tenant_id: user.tenant_id,
        })
        .await?;

    tracing::info!(
        user_id = invited.id,
        tenant_id = invited.tenant_id,
        role = %invited.role,
        invited_by = user.id,
        "User invited"
    );

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            message: "User invited successfully".to_string(),
            user: InvitedUser {
                id: invited.id,
                email: invited.email,
                role: invited.role,
                temp_password,
            },
        }),
    ))
}
