use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::{MemoryStore, Store};
use crate::payments::{PaymentError, PaymentIntent, PaymentProcessor};
use crate::state::AppState;

pub const TEST_SECRET: &str = "test-secret-key-12345";

/// Payment processor double that records every intent request.
#[derive(Default)]
pub struct FakeProcessor {
    fail: bool,
    calls: Mutex<Vec<(i64, String)>>,
}

impl FakeProcessor {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn calls(&self) -> Vec<(i64, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, PaymentError> {
        if self.fail {
            return Err(PaymentError::Rejected {
                status: 402,
                message: "card declined".to_string(),
            });
        }
        let mut calls = self.calls.lock().await;
        calls.push((amount, currency.to_string()));
        let id = format!("pi_test_{}", calls.len());
        Ok(PaymentIntent {
            client_secret: format!("{}_secret_test", id),
            id,
            amount,
            currency: currency.to_string(),
        })
    }
}

/// App state over a fresh in-memory store and fake processor.
pub fn test_state() -> (AppState, Arc<MemoryStore>, Arc<FakeProcessor>) {
    let mut config = AppConfig::from_env();
    config.security.jwt_secret = TEST_SECRET.to_string();
    config.security.guard_open_routes = false;

    let store = Arc::new(MemoryStore::new());
    let processor = Arc::new(FakeProcessor::default());
    let state = AppState::new(
        config,
        store.clone() as Arc<dyn Store>,
        processor.clone(),
    );
    (state, store, processor)
}

pub fn test_tokens() -> TokenService {
    TokenService::new(TEST_SECRET, 3600)
}
