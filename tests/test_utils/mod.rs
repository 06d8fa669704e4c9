//! Test utilities for driving a live server.
//!
//! Spawns the real router on an ephemeral port and exposes small reqwest helpers
//! for logging in and calling authenticated routes.

#![allow(dead_code)]

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tenant_notes::{
    config::AppConfig,
    server::{AppState, create_app},
    store::Store,
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

/// Password of every seeded account.
pub const SEED_PASSWORD: &str = tenant_notes::seeds::SEED_PASSWORD;

pub struct TestServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl TestServerHandle {
    fn new(shutdown_tx: oneshot::Sender<()>, join_handle: JoinHandle<Result<()>>) -> Self {
        Self {
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
        }
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.join_handle.take() {
            let result = handle.await.context("server task join failed")?;
            result?;
        }

        Ok(())
    }
}

impl Drop for TestServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Configuration used by integration tests.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        ..Default::default()
    }
}

/// A running server plus a client bound to it.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Store,
    pub handle: TestServerHandle,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in and return the full response body.
    pub async fn login(&self, email: &str, password: &str) -> Result<(reqwest::StatusCode, Value)> {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }

    /// Log in as a seeded account and return its bearer token.
    pub async fn token(&self, email: &str) -> Result<String> {
        let (status, body) = self.login(email, SEED_PASSWORD).await?;
        anyhow::ensure!(status.is_success(), "login for {email} failed: {body}");
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response carries a token")
    }

    /// Send an authenticated request and decode the JSON response.
    pub async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> Result<(reqwest::StatusCode, Value)> {
        let mut request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok((status, json))
    }
}

/// Spawn the router over `store` on 127.0.0.1 with an ephemeral port.
pub async fn spawn_app_with(config: AppConfig, store: Store) -> Result<TestApp> {
    let state = AppState::new(config, store.clone());
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let (ready_tx, ready_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let _ = ready_tx.send(());

        server.await.context("axum server error")
    });

    ready_rx.await.context("server task to signal readiness")?;

    Ok(TestApp {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        store,
        handle: TestServerHandle::new(shutdown_tx, server_task),
    })
}

/// Spawn the router over a fresh, seeded in-memory store.
pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(test_config(), Store::in_memory()?).await
}
