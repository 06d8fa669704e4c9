//! # Server Configuration
//!
//! This module contains the application state, router assembly and server
//! startup for the notes API.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{TokenService, auth_middleware};
use crate::config::AppConfig;
use crate::handlers;
use crate::payments::{MockPaymentProvider, PaymentProvider};
use crate::store::Store;
use crate::telemetry::trace_id_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
    pub tokens: TokenService,
    pub payments: Arc<dyn PaymentProvider>,
}

impl AppState {
    /// Build state from configuration, using the in-process payment provider.
    pub fn new(config: AppConfig, store: Store) -> Self {
        let tokens = TokenService::from_config(&config);
        let payments = Arc::new(MockPaymentProvider::new(config.payment_auto_succeed));

        Self {
            config: Arc::new(config),
            store,
            tokens,
            payments,
        }
    }

    /// Swap the payment provider.
    pub fn with_payment_provider(mut self, payments: Arc<dyn PaymentProvider>) -> Self {
        self.payments = payments;
        self
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/notes",
            get(handlers::notes::list_notes).post(handlers::notes::create_note),
        )
        .route(
            "/api/notes/{id}",
            get(handlers::notes::get_note)
                .put(handlers::notes::update_note)
                .delete(handlers::notes::delete_note),
        )
        .route("/api/tenants/{slug}", get(handlers::tenants::get_tenant))
        .route(
            "/api/tenants/{slug}/upgrade",
            post(handlers::tenants::upgrade_tenant),
        )
        .route(
            "/api/tenants/{slug}/reset",
            post(handlers::tenants::reset_tenant),
        )
        .route("/api/users/invite", post(handlers::users::invite_user))
        .route(
            "/api/payments/create-intent",
            post(handlers::payments::create_intent),
        )
        .route(
            "/api/payments/confirm",
            post(handlers::payments::confirm_payment),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/verify", get(handlers::auth::verify))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .fallback(handlers::fallback)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id_middleware))
        .layer(cors)
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, store: Store) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let profile = config.profile.clone();

    let state = AppState::new(config, store);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

struct BearerAuthAddon;

impl Modify for BearerAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::auth::login,
        crate::handlers::auth::verify,
        crate::handlers::notes::list_notes,
        crate::handlers::notes::create_note,
        crate::handlers::notes::get_note,
        crate::handlers::notes::update_note,
        crate::handlers::notes::delete_note,
        crate::handlers::tenants::get_tenant,
        crate::handlers::tenants::upgrade_tenant,
        crate::handlers::tenants::reset_tenant,
        crate::handlers::users::invite_user,
        crate::handlers::payments::create_intent,
        crate::handlers::payments::confirm_payment,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::HealthStatus,
            crate::models::Tenant,
            crate::models::SubscriptionPlan,
            crate::models::Role,
            crate::error::ApiError,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::SessionUser,
            crate::handlers::notes::NotePayload,
            crate::handlers::notes::NoteResponse,
            crate::handlers::notes::MessageResponse,
            crate::handlers::tenants::UpgradeResponse,
            crate::handlers::tenants::ResetResponse,
            crate::handlers::users::InviteRequest,
            crate::handlers::users::InviteResponse,
            crate::handlers::users::InvitedUser,
            crate::handlers::payments::CreateIntentRequest,
            crate::handlers::payments::CreateIntentResponse,
            crate::handlers::payments::ConfirmPaymentRequest,
            crate::handlers::payments::ConfirmPaymentResponse,
        )
    ),
    modifiers(&BearerAuthAddon),
    tags(
        (name = "root", description = "Service information"),
        (name = "auth", description = "Login and token verification"),
        (name = "notes", description = "Tenant-scoped notes"),
        (name = "tenants", description = "Tenant lookup and subscription plan"),
        (name = "users", description = "User invitations"),
        (name = "payments", description = "Pro plan checkout"),
    ),
    info(
        title = "Tenant Notes API",
        description = "Multi-tenant notes service with plan limits and subscription upgrades",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
