#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use bistro_api::auth::{IdentityClaims, TokenService};
use bistro_api::config::{AppConfig, StoreBackend};
use bistro_api::database::{MemoryStore, Store};
use bistro_api::payments::{PaymentError, PaymentIntent, PaymentProcessor};
use bistro_api::state::AppState;

pub const SECRET: &str = "integration-secret";

/// Records intent requests instead of calling the processor.
#[derive(Default)]
pub struct FakeProcessor {
    pub calls: Mutex<Vec<(i64, String)>>,
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, PaymentError> {
        let mut calls = self.calls.lock().await;
        calls.push((amount, currency.to_string()));
        Ok(PaymentIntent {
            id: format!("pi_{}", calls.len()),
            amount,
            currency: currency.to_string(),
            client_secret: format!("pi_{}_secret_abc", calls.len()),
        })
    }
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub processor: Arc<FakeProcessor>,
    pub client: reqwest::Client,
    tokens: TokenService,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token_for(&self, email: &str) -> String {
        self.tokens
            .issue(IdentityClaims::new(email))
            .expect("failed to sign test token")
    }

    /// Registers `email` and promotes it through the admin route.
    pub async fn register(&self, email: &str) -> Result<String> {
        let body: Value = self
            .client
            .post(self.url("/users"))
            .json(&json!({ "name": "Test User", "email": email }))
            .send()
            .await?
            .json()
            .await?;
        body["insertedId"]
            .as_str()
            .map(str::to_string)
            .with_context(|| format!("registration returned no id: {}", body))
    }

    pub async fn register_admin(&self, email: &str) -> Result<String> {
        let id = self.register(email).await?;
        let res = self
            .client
            .patch(self.url(&format!("/users/admin/{}", id)))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "promotion failed: {}", res.status());
        Ok(id)
    }

    pub async fn add_to_cart(&self, email: &str, price: f64) -> Result<String> {
        let body: Value = self
            .client
            .post(self.url("/cart"))
            .json(&json!({
                "email": email,
                "menuItemId": "642c155b2c4774f05c36eeaa",
                "name": "Roast Duck Breast",
                "price": price,
                "quantity": 1
            }))
            .send()
            .await?
            .json()
            .await?;
        body["insertedId"]
            .as_str()
            .map(str::to_string)
            .with_context(|| format!("cart insert returned no id: {}", body))
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

/// Starts the router on a fresh port over an empty in-memory store.
/// The server lives as long as the calling test's runtime.
pub async fn spawn_server() -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let mut config = AppConfig::from_env();
    config.database.backend = StoreBackend::Memory;
    config.security.jwt_secret = SECRET.to_string();
    config.security.guard_open_routes = false;

    let store = Arc::new(MemoryStore::new());
    let processor = Arc::new(FakeProcessor::default());
    let state = AppState::new(config, store.clone() as Arc<dyn Store>, processor.clone());

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, bistro_api::app(state)).await;
    });

    let server = TestServer {
        port,
        base_url,
        store,
        processor,
        client: reqwest::Client::new(),
        tokens: TokenService::new(SECRET, 3600),
    };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}
