//! Integration tests for login, token verification and the auth middleware.

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{SEED_PASSWORD, spawn_app};

#[tokio::test]
async fn admin_login_scenario() -> Result<()> {
    let app = spawn_app().await?;

    let (status, body) = app.login("admin@acme.test", SEED_PASSWORD).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "admin@acme.test");
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["tenant_slug"], "acme");

    app.handle.shutdown().await
}

#[tokio::test]
async fn token_round_trips_through_verify() -> Result<()> {
    let app = spawn_app().await?;

    for email in [
        "admin@acme.test",
        "user@acme.test",
        "admin@globex.test",
        "user@globex.test",
    ] {
        let (_, login) = app.login(email, SEED_PASSWORD).await?;
        let token = login["token"].as_str().unwrap();

        let (status, verified) = app.call(Method::GET, "/api/auth/verify", token, None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verified, login["user"], "identity mismatch for {email}");
    }

    app.handle.shutdown().await
}

#[tokio::test]
async fn bad_credentials_are_rejected() -> Result<()> {
    let app = spawn_app().await?;

    let (status, body) = app.login("admin@acme.test", "letmein").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = app.login("nobody@acme.test", SEED_PASSWORD).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "password": SEED_PASSWORD }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.handle.shutdown().await
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() -> Result<()> {
    let app = spawn_app().await?;

    let response = app.client.get(app.url("/api/notes")).send().await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let trace_id = response
        .headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"], "Authentication required");
    assert_eq!(body["trace_id"].as_str(), trace_id.as_deref());

    let (status, _) = app
        .call(Method::GET, "/api/notes", "forged.token.value", None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let health = app.client.get(app.url("/api/health")).send().await?;
    assert_eq!(health.status(), StatusCode::OK);

    app.handle.shutdown().await
}
