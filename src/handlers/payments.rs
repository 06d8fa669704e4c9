//! # Payments API Handlers
//!
//! Pro subscription checkout: create a payment intent for the plan price, then
//! confirm it to upgrade the caller's tenant.

use std::collections::HashMap;

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthUser, require_role};
use crate::error::{ApiError, bad_request};
use crate::models::SubscriptionPlan;
use crate::payments::{
    METADATA_PRODUCT, METADATA_TENANT_ID, PRO_SUBSCRIPTION_PRODUCT, PaymentIntentParams,
};
use crate::repositories::TenantRepository;
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIntentRequest {
    /// Plan price in whole currency units
    #[schema(value_type = Option<u64>, example = 2000)]
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    #[serde(default, deserialize_with = "super::non_blank")]
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    #[schema(example = "Subscription upgraded to Pro successfully!")]
    pub message: String,
    pub subscription_plan: SubscriptionPlan,
}

fn server_error(message: &str) -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
}

/// Start a Pro plan purchase
#[utoipa::path(
    post,
    path = "/api/payments/create-intent",
    security(("bearer_auth" = [])),
    request_body = CreateIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = CreateIntentResponse),
        (status = 400, description = "Amount does not match the plan price", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 500, description = "Payment provider failure", body = ApiError)
    ),
    tag = "payments"
)]
pub async fn create_intent(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateIntentRequest>, JsonRejection>,
) -> Result<Json<CreateIntentResponse>, ApiError> {
    require_role(&user, &state.config.payment_roles)?;
    let Json(request) = payload?;

    let price = state.config.pro_plan_price;
    let Some(amount_minor) = state.config.pro_plan_price_minor_units() else {
        tracing::error!(price, "Pro plan price overflows minor units");
        return Err(server_error("Failed to create payment intent"));
    };
    let amount_matches = request
        .amount
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .is_some_and(|amount| amount == price as f64);
    if !amount_matches {
        return Err(bad_request(&format!(
            "Invalid amount. Pro plan costs ${price}."
        )));
    }

    let params = PaymentIntentParams {
        amount: amount_minor,
        currency: state.config.payment_currency.clone(),
        metadata: HashMap::from([
            (METADATA_PRODUCT.to_string(), PRO_SUBSCRIPTION_PRODUCT.to_string()),
            (METADATA_TENANT_ID.to_string(), user.tenant_id.to_string()),
        ]),
    };

    let intent = state
        .payments
        .create_payment_intent(params)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, tenant_id = user.tenant_id, "Payment intent creation failed");
            server_error("Failed to create payment intent")
        })?;

    tracing::info!(
        payment_intent_id = %intent.id,
        tenant_id = user.tenant_id,
        "Payment intent created"
    );

    Ok(Json(CreateIntentResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
    }))
}

/// Complete a Pro plan purchase
#[utoipa::path(
    post,
    path = "/api/payments/confirm",
    security(("bearer_auth" = [])),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment settled, tenant upgraded", body = ConfirmPaymentResponse),
        (status = 400, description = "Missing intent id or payment not completed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 500, description = "Payment provider failure", body = ApiError)
    ),
    tag = "payments"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<ConfirmPaymentRequest>, JsonRejection>,
) -> Result<Json<ConfirmPaymentResponse>, ApiError> {
    require_role(&user, &state.config.payment_roles)?;
    let Json(request) = payload?;
    let Some(intent_id) = request.payment_intent_id else {
        return Err(bad_request("Payment intent ID is required"));
    };

    let intent = state
        .payments
        .retrieve_payment_intent(intent_id.trim())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, payment_intent_id = %intent_id, "Payment intent lookup failed");
            server_error("Failed to confirm payment")
        })?;

    let settled_for_caller = intent
        .as_ref()
        .is_some_and(|i| i.is_succeeded() && i.tenant_id() == Some(user.tenant_id));
    if !settled_for_caller {
        tracing::info!(
            payment_intent_id = %intent_id,
            tenant_id = user.tenant_id,
            "Payment not completed"
        );
        return Err(bad_request("Payment not completed"));
    }

    let tenant = TenantRepository::new(&state.store)
        .set_plan(user.tenant_id, SubscriptionPlan::Pro)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, tenant_id = user.tenant_id, "Subscription upgrade failed");
            server_error("Failed to upgrade subscription")
        })?;

    metrics::counter!("tenant_plan_changes_total", "plan" => SubscriptionPlan::Pro.as_str())
        .increment(1);
    tracing::info!(
        tenant = %tenant.slug,
        payment_intent_id = %intent_id,
        "Subscription upgraded after payment"
    );

    Ok(Json(ConfirmPaymentResponse {
        success: true,
        message: "Subscription upgraded to Pro successfully!".to_string(),
        subscription_plan: tenant.subscription_plan,
    }))
}
