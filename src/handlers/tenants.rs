//! # Tenants API Handlers
//!
//! Tenant lookup and subscription plan changes. Callers may only see and change
//! their own tenant.

use axum::{
    extract::{Path, State},
    response::Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthUser, require_role};
use crate::error::{ApiError, RepositoryError, forbidden, not_found};
use crate::models::{SubscriptionPlan, Tenant};
use crate::repositories::TenantRepository;
use crate::server::AppState;

/// Result of an upgrade to Pro
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpgradeResponse {
    #[schema(example = "Subscription upgraded to Pro successfully")]
    pub message: String,
    pub subscription_plan: SubscriptionPlan,
    #[schema(example = "acme")]
    pub tenant_slug: String,
    pub success: bool,
}

/// Result of a reset to Free
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetResponse {
    #[schema(example = "Subscription reset to Free successfully")]
    pub message: String,
    pub subscription_plan: SubscriptionPlan,
}

/// Get the caller's tenant by slug
#[utoipa::path(
    get,
    path = "/api/tenants/{slug}",
    security(("bearer_auth" = [])),
    params(
        ("slug" = String, Path, description = "Tenant slug")
    ),
    responses(
        (status = 200, description = "Tenant record", body = Tenant),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Tenant belongs to another organization", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<Tenant>, ApiError> {
    let tenant = TenantRepository::new(&state.store)
        .get_by_slug(&slug)
        .await
        .ok_or_else(|| not_found("Tenant not found"))?;

    if user.tenant_slug != slug {
        return Err(forbidden(Some("Access denied")));
    }

    Ok(Json(tenant))
}

/// Upgrade the caller's tenant to the Pro plan
#[utoipa::path(
    post,
    path = "/api/tenants/{slug}/upgrade",
    security(("bearer_auth" = [])),
    params(
        ("slug" = String, Path, description = "Tenant slug")
    ),
    responses(
        (status = 200, description = "Tenant is on the Pro plan", body = UpgradeResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Role not allowed or other tenant", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn upgrade_tenant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<UpgradeResponse>, ApiError> {
    let tenant = change_plan(
        &state,
        &user,
        &slug,
        SubscriptionPlan::Pro,
        "Only administrators can upgrade subscriptions",
    )
    .await?;

    Ok(Json(UpgradeResponse {
        message: "Subscription upgraded to Pro successfully".to_string(),
        subscription_plan: tenant.subscription_plan,
        tenant_slug: tenant.slug,
        success: true,
    }))
}

/// Reset the caller's tenant to the Free plan
#[utoipa::path(
    post,
    path = "/api/tenants/{slug}/reset",
    security(("bearer_auth" = [])),
    params(
        ("slug" = String, Path, description = "Tenant slug")
    ),
    responses(
        (status = 200, description = "Tenant is on the Free plan", body = ResetResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Role not allowed or other tenant", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn reset_tenant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    let tenant = change_plan(
        &state,
        &user,
        &slug,
        SubscriptionPlan::Free,
        "Only administrators can reset subscriptions",
    )
    .await?;

    Ok(Json(ResetResponse {
        message: "Subscription reset to Free successfully".to_string(),
        subscription_plan: tenant.subscription_plan,
    }))
}

async fn change_plan(
    state: &AppState,
    user: &AuthUser,
    slug: &str,
    plan: SubscriptionPlan,
    role_denied: &str,
) -> Result<Tenant, ApiError> {
    require_role(user, &state.config.upgrade_roles).map_err(|_| forbidden(Some(role_denied)))?;

    if user.tenant_slug != slug {
        return Err(forbidden(Some("Access denied")));
    }

    let tenant = TenantRepository::new(&state.store)
        .set_plan_by_slug(slug, plan)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound(_) => not_found("Tenant not found"),
            other => other.into(),
        })?;

    counter!("tenant_plan_changes_total", "plan" => plan.as_str()).increment(1);
    tracing::info!(tenant = %tenant.slug, plan = %plan, user_id = user.id, "Subscription plan changed");

    Ok(tenant)
}
