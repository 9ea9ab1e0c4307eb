use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::database::models::{PaymentRecord, SettlementState};
use crate::database::{parse_id, DatabaseError, DeleteResult, InsertResult, Store};
use crate::middleware::AuthUser;
use crate::payments::{PaymentError, PaymentProcessor};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("price must be a positive amount, got {0}")]
    InvalidPrice(Decimal),

    #[error("invalid cart item id: {0}")]
    InvalidCartItem(String),

    #[error("payment owner does not match the authenticated identity")]
    IdentityMismatch,

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The payment is recorded but its cart entries are not yet removed;
    /// reconciliation finishes the job.
    #[error("payment {payment_id} recorded but cart cleanup failed: {source}")]
    Incomplete {
        payment_id: String,
        #[source]
        source: DatabaseError,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub client_secret: String,
}

/// Body of `POST /payments`: the confirmed client-side payment plus the
/// cart entries it paid for.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub quantity: Option<u32>,
    pub cart_items: Vec<String>,
    #[serde(default)]
    pub menu_items: Vec<String>,
    #[serde(default)]
    pub item_names: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub result: InsertResult,
    pub delete_result: DeleteResult,
}

/// Summary of one reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub settled: usize,
    pub cart_entries_removed: u64,
    pub failed: usize,
}

/// Converts a cart into a persisted payment record.
///
/// Capture is two-phase: the record is written `pending`, the referenced
/// cart entries are deleted, and only then is the record marked `settled`.
/// Cart deletion is delete-if-present and limited to the payer's own
/// entries, so a pending record can be replayed by
/// [`SettlementService::reconcile_pending`] any number of times.
///
/// A sweep that overlaps a capture still in flight would make that capture
/// report `deletedCount: 0`; sweeps therefore skip records younger than
/// their grace period.
#[derive(Clone)]
pub struct SettlementService {
    store: Arc<dyn Store>,
    processor: Arc<dyn PaymentProcessor>,
    currency: String,
}

/// Price in minor currency units, truncated toward zero.
pub fn to_minor_units(price: Decimal) -> Result<i64, SettlementError> {
    if price <= Decimal::ZERO {
        return Err(SettlementError::InvalidPrice(price));
    }
    (price * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .filter(|amount| *amount > 0)
        .ok_or(SettlementError::InvalidPrice(price))
}

impl SettlementService {
    pub fn new(store: Arc<dyn Store>, processor: Arc<dyn PaymentProcessor>, currency: impl Into<String>) -> Self {
        Self {
            store,
            processor,
            currency: currency.into(),
        }
    }

    pub async fn create_intent(&self, request: IntentRequest) -> Result<IntentResponse, SettlementError> {
        let amount = to_minor_units(request.price)?;
        let intent = self.processor.create_intent(amount, &self.currency).await?;
        info!("Payment intent {} created for {} minor units", intent.id, amount);

        Ok(IntentResponse {
            client_secret: intent.client_secret,
        })
    }

    pub async fn capture(&self, caller: &AuthUser, request: CaptureRequest) -> Result<CaptureResponse, SettlementError> {
        if let Some(email) = &request.email {
            if email != &caller.email {
                warn!("Payment capture by {} claimed owner {}", caller.email, email);
                return Err(SettlementError::IdentityMismatch);
            }
        }
        if request.price < Decimal::ZERO {
            return Err(SettlementError::InvalidPrice(request.price));
        }
        // Validate every id up front so a bad id never leaves a half-written settlement.
        if let Some(bad) = request.cart_items.iter().find(|id| parse_id(id).is_none()) {
            return Err(SettlementError::InvalidCartItem(bad.clone()));
        }

        let record = PaymentRecord {
            id: None,
            email: caller.email.clone(),
            price: request.price,
            currency: request.currency.unwrap_or_else(|| self.currency.clone()),
            transaction_id: request.transaction_id,
            date: request.date.unwrap_or_else(Utc::now),
            quantity: request.quantity.unwrap_or(request.cart_items.len() as u32),
            cart_items: request.cart_items,
            menu_items: request.menu_items,
            item_names: request.item_names,
            status: request.status,
            settlement: SettlementState::Pending,
            recorded_at: Some(Utc::now()),
        };
        let cart_items = record.cart_items.clone();

        let result = self.store.insert_payment(record).await?;
        let payment_id = result.inserted_id.clone();

        let delete_result = self
            .finish(&payment_id, &caller.email, &cart_items)
            .await
            .map_err(|source| SettlementError::Incomplete {
                payment_id: payment_id.clone(),
                source,
            })?;

        info!(
            "Settled payment {} for {}: {} cart entries removed",
            payment_id, caller.email, delete_result.deleted_count
        );
        Ok(CaptureResponse { result, delete_result })
    }

    /// Second phase: remove the paid cart entries, then mark the record settled.
    async fn finish(&self, payment_id: &str, email: &str, cart_items: &[String]) -> Result<DeleteResult, DatabaseError> {
        let deleted = self.store.delete_cart_entries(email, cart_items).await?;
        self.store.mark_payment_settled(payment_id).await?;
        Ok(deleted)
    }

    /// Replays the second phase for every record still pending that was
    /// recorded at least `grace` ago. Records without a server timestamp
    /// are always eligible.
    pub async fn reconcile_pending(&self, grace: Duration) -> Result<ReconcileReport, DatabaseError> {
        let Some(cutoff) = Utc::now().checked_sub_signed(grace) else {
            return Ok(ReconcileReport::default());
        };
        let pending = self.store.pending_payments().await?;
        let mut report = ReconcileReport::default();

        for record in pending {
            let Some(id) = record.id.as_deref() else {
                continue;
            };
            if record.recorded_at.is_some_and(|at| at > cutoff) {
                continue;
            }
            match self.finish(id, &record.email, &record.cart_items).await {
                Ok(deleted) => {
                    report.settled += 1;
                    report.cart_entries_removed += deleted.deleted_count;
                }
                Err(e) => {
                    error!("Reconciliation of payment {} failed: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        if report.settled > 0 || report.failed > 0 {
            info!(
                "Reconciled {} pending payments ({} cart entries removed, {} failed)",
                report.settled, report.cart_entries_removed, report.failed
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::CartEntry;
    use crate::database::MemoryStore;
    use crate::testing::FakeProcessor;

    fn caller(email: &str) -> AuthUser {
        AuthUser {
            email: email.to_string(),
        }
    }

    fn entry(email: &str) -> CartEntry {
        CartEntry {
            id: None,
            email: email.to_string(),
            menu_item_id: "m1".to_string(),
            name: None,
            image: None,
            price: Decimal::new(1275, 2),
            quantity: 1,
        }
    }

    fn capture_request(cart_items: Vec<String>) -> CaptureRequest {
        CaptureRequest {
            email: None,
            price: Decimal::new(2550, 2),
            currency: None,
            transaction_id: Some("pi_123".to_string()),
            date: None,
            quantity: None,
            cart_items,
            menu_items: Vec::new(),
            item_names: Vec::new(),
            status: Some("service pending".to_string()),
        }
    }

    #[test]
    fn minor_units_truncate() {
        assert_eq!(to_minor_units(Decimal::new(2550, 2)).unwrap(), 2550);
        assert_eq!(to_minor_units(Decimal::new(19999, 3)).unwrap(), 1999);
        assert_eq!(to_minor_units(Decimal::new(12, 0)).unwrap(), 1200);
        assert!(to_minor_units(Decimal::ZERO).is_err());
        assert!(to_minor_units(Decimal::new(-5, 0)).is_err());
        assert!(to_minor_units(Decimal::new(1, 3)).is_err());
    }

    #[tokio::test]
    async fn intent_charges_minor_units_in_configured_currency() {
        let processor = Arc::new(FakeProcessor::default());
        let service = SettlementService::new(Arc::new(MemoryStore::new()), processor.clone(), "usd");

        let response = service
            .create_intent(IntentRequest {
                price: Decimal::new(2550, 2),
            })
            .await
            .unwrap();

        assert!(response.client_secret.starts_with("pi_"));
        assert_eq!(processor.calls().await, vec![(2550, "usd".to_string())]);
    }

    #[tokio::test]
    async fn processor_failure_surfaces_as_error() {
        let service = SettlementService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FakeProcessor::failing()),
            "usd",
        );

        let err = service
            .create_intent(IntentRequest {
                price: Decimal::new(500, 2),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Payment(_)));
    }

    #[tokio::test]
    async fn capture_records_payment_and_clears_exactly_the_paid_entries() {
        let store = Arc::new(MemoryStore::new());
        let id1 = store.insert_cart_entry(entry("a@x.com")).await.unwrap().inserted_id;
        let id2 = store.insert_cart_entry(entry("a@x.com")).await.unwrap().inserted_id;
        let kept = store.insert_cart_entry(entry("a@x.com")).await.unwrap().inserted_id;
        let service = SettlementService::new(store.clone(), Arc::new(FakeProcessor::default()), "usd");

        let response = service
            .capture(&caller("a@x.com"), capture_request(vec![id1, id2]))
            .await
            .unwrap();

        assert_eq!(response.delete_result.deleted_count, 2);
        let payments = store.payments().await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].id.as_deref(), Some(response.result.inserted_id.as_str()));
        assert_eq!(payments[0].settlement, SettlementState::Settled);
        assert_eq!(payments[0].email, "a@x.com");
        assert_eq!(payments[0].quantity, 2);

        let cart = store.find_cart("a@x.com").await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].id.as_deref(), Some(kept.as_str()));
    }

    #[tokio::test]
    async fn replaying_a_capture_deletes_nothing_more() {
        let store = Arc::new(MemoryStore::new());
        let id1 = store.insert_cart_entry(entry("a@x.com")).await.unwrap().inserted_id;
        let service = SettlementService::new(store.clone(), Arc::new(FakeProcessor::default()), "usd");

        let first = service
            .capture(&caller("a@x.com"), capture_request(vec![id1.clone()]))
            .await
            .unwrap();
        let second = service
            .capture(&caller("a@x.com"), capture_request(vec![id1]))
            .await
            .unwrap();

        assert_eq!(first.delete_result.deleted_count, 1);
        assert_eq!(second.delete_result.deleted_count, 0);
    }

    #[tokio::test]
    async fn malformed_cart_id_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let service = SettlementService::new(store.clone(), Arc::new(FakeProcessor::default()), "usd");

        let err = service
            .capture(&caller("a@x.com"), capture_request(vec!["not-an-id".to_string()]))
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::InvalidCartItem(_)));
        assert!(store.payments().await.is_empty());
    }

    #[tokio::test]
    async fn capture_for_someone_else_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let service = SettlementService::new(store.clone(), Arc::new(FakeProcessor::default()), "usd");
        let mut request = capture_request(Vec::new());
        request.email = Some("b@y.com".to_string());

        let err = service.capture(&caller("a@x.com"), request).await.unwrap_err();
        assert!(matches!(err, SettlementError::IdentityMismatch));
        assert!(store.payments().await.is_empty());
    }

    #[tokio::test]
    async fn reconcile_finishes_pending_records() {
        let store = Arc::new(MemoryStore::new());
        let id1 = store.insert_cart_entry(entry("a@x.com")).await.unwrap().inserted_id;
        let id2 = store.insert_cart_entry(entry("a@x.com")).await.unwrap().inserted_id;

        // A capture that crashed after writing the record.
        store
            .insert_payment(PaymentRecord {
                id: None,
                email: "a@x.com".to_string(),
                price: Decimal::new(2550, 2),
                currency: "usd".to_string(),
                transaction_id: None,
                date: Utc::now(),
                quantity: 2,
                cart_items: vec![id1, id2],
                menu_items: Vec::new(),
                item_names: Vec::new(),
                status: None,
                settlement: SettlementState::Pending,
                recorded_at: None,
            })
            .await
            .unwrap();

        let service = SettlementService::new(store.clone(), Arc::new(FakeProcessor::default()), "usd");
        let report = service.reconcile_pending(Duration::zero()).await.unwrap();

        assert_eq!(
            report,
            ReconcileReport {
                settled: 1,
                cart_entries_removed: 2,
                failed: 0
            }
        );
        assert!(store.find_cart("a@x.com").await.unwrap().is_empty());
        assert!(store.pending_payments().await.unwrap().is_empty());

        let again = service.reconcile_pending(Duration::zero()).await.unwrap();
        assert_eq!(again, ReconcileReport::default());
    }

    fn pending_record(cart_items: Vec<String>, recorded_at: Option<DateTime<Utc>>) -> PaymentRecord {
        PaymentRecord {
            id: None,
            email: "a@x.com".to_string(),
            price: Decimal::new(1275, 2),
            currency: "usd".to_string(),
            transaction_id: None,
            date: Utc::now(),
            quantity: 1,
            cart_items,
            menu_items: Vec::new(),
            item_names: Vec::new(),
            status: None,
            settlement: SettlementState::Pending,
            recorded_at,
        }
    }

    #[tokio::test]
    async fn sweep_leaves_fresh_captures_to_their_own_request() {
        let store = Arc::new(MemoryStore::new());
        let fresh = store.insert_cart_entry(entry("a@x.com")).await.unwrap().inserted_id;
        let stale = store.insert_cart_entry(entry("a@x.com")).await.unwrap().inserted_id;
        store
            .insert_payment(pending_record(vec![fresh.clone()], Some(Utc::now())))
            .await
            .unwrap();
        store
            .insert_payment(pending_record(vec![stale], Some(Utc::now() - Duration::minutes(10))))
            .await
            .unwrap();

        let service = SettlementService::new(store.clone(), Arc::new(FakeProcessor::default()), "usd");
        let report = service.reconcile_pending(Duration::minutes(5)).await.unwrap();

        assert_eq!(report.settled, 1);
        assert_eq!(report.cart_entries_removed, 1);
        let cart = store.find_cart("a@x.com").await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].id.as_deref(), Some(fresh.as_str()));
        assert_eq!(store.pending_payments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn capture_never_removes_another_customers_entries() {
        let store = Arc::new(MemoryStore::new());
        let mine = store.insert_cart_entry(entry("a@x.com")).await.unwrap().inserted_id;
        let theirs = store.insert_cart_entry(entry("b@y.com")).await.unwrap().inserted_id;
        let service = SettlementService::new(store.clone(), Arc::new(FakeProcessor::default()), "usd");

        let response = service
            .capture(&caller("a@x.com"), capture_request(vec![mine, theirs.clone()]))
            .await
            .unwrap();

        assert_eq!(response.delete_result.deleted_count, 1);
        let cart = store.find_cart("b@y.com").await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].id.as_deref(), Some(theirs.as_str()));
    }
}
