use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementState {
    /// Recorded; referenced cart entries may still exist.
    #[default]
    Pending,
    Settled,
}

/// Created exactly once per successful checkout; only `settlement` changes
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub cart_items: Vec<String>,
    #[serde(default)]
    pub menu_items: Vec<String>,
    #[serde(default)]
    pub item_names: Vec<String>,
    /// Order status as reported by the client, e.g. "service pending".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub settlement: SettlementState,
    /// Server clock at capture; `date` is whatever the client reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}
