pub mod memory;
pub mod models;
pub mod mongo;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use models::{CartEntry, MenuItem, PaymentRecord, Review, Role, User};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Errors from the document store adapters
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),

    #[error("Document mapping error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Duplicate(String),
}

impl From<mongodb::bson::ser::Error> for DatabaseError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        DatabaseError::Serialization(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for DatabaseError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        DatabaseError::Serialization(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: String,
}

impl InsertResult {
    pub fn new(inserted_id: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            inserted_id: inserted_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
}

impl UpdateResult {
    pub fn new(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

/// Store-reported document counts; estimates on the MongoDB backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollectionCounts {
    pub users: u64,
    pub menu_items: u64,
    pub payments: u64,
}

/// Document identifiers are 24-digit hex ObjectIds on every backend.
pub fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

pub fn new_id() -> String {
    ObjectId::new().to_hex()
}

/// Collection-scoped operations over the bistro database. Every call is a
/// single-document or single-filter operation; no call spans collections.
///
/// Missing ids are never errors: updates and deletes report zero effect.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Releases pooled connections; the store must not be used afterwards.
    async fn shutdown(&self);

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    /// Fails with `DatabaseError::Duplicate` when the email is taken.
    async fn insert_user(&self, user: User) -> Result<InsertResult, DatabaseError>;
    async fn set_user_role(&self, id: &str, role: Role) -> Result<UpdateResult, DatabaseError>;

    async fn list_menu(&self) -> Result<Vec<MenuItem>, DatabaseError>;
    async fn insert_menu_item(&self, item: MenuItem) -> Result<InsertResult, DatabaseError>;
    async fn delete_menu_item(&self, id: &str) -> Result<DeleteResult, DatabaseError>;

    async fn list_reviews(&self) -> Result<Vec<Review>, DatabaseError>;

    async fn find_cart(&self, email: &str) -> Result<Vec<CartEntry>, DatabaseError>;
    async fn insert_cart_entry(&self, entry: CartEntry) -> Result<InsertResult, DatabaseError>;
    async fn delete_cart_entry(&self, id: &str) -> Result<DeleteResult, DatabaseError>;
    /// Delete-if-present for every id owned by `email`; repeating the call
    /// is a no-op.
    async fn delete_cart_entries(&self, email: &str, ids: &[String]) -> Result<DeleteResult, DatabaseError>;

    async fn insert_payment(&self, record: PaymentRecord) -> Result<InsertResult, DatabaseError>;
    async fn mark_payment_settled(&self, id: &str) -> Result<UpdateResult, DatabaseError>;
    async fn pending_payments(&self) -> Result<Vec<PaymentRecord>, DatabaseError>;

    async fn estimated_counts(&self) -> Result<CollectionCounts, DatabaseError>;
    /// Sum of `price` across every payment record.
    async fn total_revenue(&self) -> Result<Decimal, DatabaseError>;
}
