use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::PaymentConfig;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment processor secret key is not configured")]
    NotConfigured,

    #[error("payment processor unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment processor rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("payment intent carries no client secret")]
    MissingClientSecret,
}

/// Card payment intent created with the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    /// Handed to the browser so it can confirm the payment.
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// `amount` is in minor currency units (cents for USD).
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, PaymentError>;
}

/// Stripe REST client for `POST /v1/payment_intents`.
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    amount: i64,
    currency: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<PaymentIntent, PaymentError> {
        if self.secret_key.is_empty() {
            return Err(PaymentError::NotConfigured);
        }

        let amount_param = amount.to_string();
        let form = [
            ("amount", amount_param.as_str()),
            ("currency", currency),
            ("payment_method_types[]", "card"),
        ];

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let intent: StripeIntent = response.json().await?;
        tracing::debug!("Created payment intent {} for {} {}", intent.id, intent.amount, intent.currency);

        Ok(PaymentIntent {
            client_secret: intent.client_secret.ok_or(PaymentError::MissingClientSecret)?,
            id: intent.id,
            amount: intent.amount,
            currency: intent.currency,
        })
    }
}
