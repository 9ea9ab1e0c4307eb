use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use super::models::{CartEntry, MenuItem, PaymentRecord, Review, Role, SettlementState, User};
use super::{
    parse_id, CollectionCounts, DatabaseError, DeleteResult, InsertResult, Store, UpdateResult,
};
use crate::config::{ConfigError, DatabaseConfig};

const USERS: &str = "users";
const MENU: &str = "menu";
const REVIEWS: &str = "reviews";
const CART: &str = "cart";
const PAYMENTS: &str = "payments";

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store. Owns the client's connection pool for its whole
/// lifetime; call [`Store::shutdown`] before dropping.
pub struct MongoStore {
    client: Client,
    db: Database,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<mongodb::error::Error> for ConnectError {
    fn from(err: mongodb::error::Error) -> Self {
        ConnectError::Database(err.into())
    }
}

impl MongoStore {
    /// Connects, pings the deployment and ensures the unique email index.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ConnectError> {
        let uri = config.connection_uri()?;
        let mut options = ClientOptions::parse(&uri).await?;
        options.app_name = Some("bistro-api".to_string());
        options.max_pool_size = Some(config.max_pool_size);
        options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
        options.server_selection_timeout = Some(Duration::from_secs(config.connect_timeout_secs));

        let client = Client::with_options(options)?;
        let db = client.database(&config.name);
        let store = Self { client, db };

        store.ping().await?;
        info!("Pinged your deployment. You successfully connected to MongoDB!");

        store.ensure_indexes().await;
        Ok(store)
    }

    async fn ensure_indexes(&self) {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        // Legacy data may already hold duplicate emails; the pre-insert lookup still applies.
        if let Err(e) = self.collection(USERS).create_index(index).await {
            warn!("Could not create unique index on users.email: {}", e);
        }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

    async fn find_all<T: DeserializeOwned>(
        &self,
        name: &str,
        filter: Document,
    ) -> Result<Vec<T>, DatabaseError> {
        let documents: Vec<Document> = self.collection(name).find(filter).await?.try_collect().await?;
        documents.into_iter().map(from_stored).collect()
    }

    async fn insert<T: Serialize>(&self, name: &str, value: &T) -> Result<InsertResult, DatabaseError> {
        let result = self.collection(name).insert_one(to_stored(value)?).await?;
        Ok(InsertResult::new(id_string(&result.inserted_id)))
    }
}

/// Serializes a model for storage, letting the server assign `_id`.
fn to_stored<T: Serialize>(value: &T) -> Result<Document, DatabaseError> {
    let mut document = bson::to_document(value)?;
    document.remove("_id");
    Ok(document)
}

/// Deserializes a stored document, exposing an ObjectId `_id` as hex.
fn from_stored<T: DeserializeOwned>(mut document: Document) -> Result<T, DatabaseError> {
    if let Some(Bson::ObjectId(oid)) = document.get("_id") {
        let hex = oid.to_hex();
        document.insert("_id", hex);
    }
    Ok(bson::from_document(document)?)
}

fn id_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn object_id_filter(id: &str) -> Option<Document> {
    parse_id(id).map(|oid| doc! { "_id": oid })
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.client.database("admin").run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        info!("Closed MongoDB connection pool");
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        self.find_all(USERS, doc! {}).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        self.collection(USERS)
            .find_one(doc! { "email": email })
            .await?
            .map(from_stored)
            .transpose()
    }

    async fn insert_user(&self, user: User) -> Result<InsertResult, DatabaseError> {
        match self.insert(USERS, &user).await {
            Err(DatabaseError::Driver(e)) if is_duplicate_key(&e) => {
                Err(DatabaseError::Duplicate(format!("user {} already exists", user.email)))
            }
            other => other,
        }
    }

    async fn set_user_role(&self, id: &str, role: Role) -> Result<UpdateResult, DatabaseError> {
        let Some(filter) = object_id_filter(id) else {
            return Ok(UpdateResult::new(0, 0));
        };
        let role = bson::to_bson(&role)?;
        let result = self
            .collection(USERS)
            .update_one(filter, doc! { "$set": { "role": role } })
            .await?;
        Ok(UpdateResult::new(result.matched_count, result.modified_count))
    }

    async fn list_menu(&self) -> Result<Vec<MenuItem>, DatabaseError> {
        self.find_all(MENU, doc! {}).await
    }

    async fn insert_menu_item(&self, item: MenuItem) -> Result<InsertResult, DatabaseError> {
        self.insert(MENU, &item).await
    }

    async fn delete_menu_item(&self, id: &str) -> Result<DeleteResult, DatabaseError> {
        // Seeded menu documents carry plain string ids.
        let filter = match parse_id(id) {
            Some(oid) => doc! { "_id": { "$in": [oid, id] } },
            None => doc! { "_id": id },
        };
        let result = self.collection(MENU).delete_one(filter).await?;
        Ok(DeleteResult::new(result.deleted_count))
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, DatabaseError> {
        self.find_all(REVIEWS, doc! {}).await
    }

    async fn find_cart(&self, email: &str) -> Result<Vec<CartEntry>, DatabaseError> {
        self.find_all(CART, doc! { "email": email }).await
    }

    async fn insert_cart_entry(&self, entry: CartEntry) -> Result<InsertResult, DatabaseError> {
        self.insert(CART, &entry).await
    }

    async fn delete_cart_entry(&self, id: &str) -> Result<DeleteResult, DatabaseError> {
        let Some(filter) = object_id_filter(id) else {
            return Ok(DeleteResult::new(0));
        };
        let result = self.collection(CART).delete_one(filter).await?;
        Ok(DeleteResult::new(result.deleted_count))
    }

    async fn delete_cart_entries(&self, email: &str, ids: &[String]) -> Result<DeleteResult, DatabaseError> {
        let oids: Vec<Bson> = ids
            .iter()
            .filter_map(|id| parse_id(id))
            .map(Bson::ObjectId)
            .collect();
        if oids.is_empty() {
            return Ok(DeleteResult::new(0));
        }
        let result = self
            .collection(CART)
            .delete_many(doc! { "_id": { "$in": oids }, "email": email })
            .await?;
        Ok(DeleteResult::new(result.deleted_count))
    }

    async fn insert_payment(&self, record: PaymentRecord) -> Result<InsertResult, DatabaseError> {
        self.insert(PAYMENTS, &record).await
    }

    async fn mark_payment_settled(&self, id: &str) -> Result<UpdateResult, DatabaseError> {
        let Some(filter) = object_id_filter(id) else {
            return Ok(UpdateResult::new(0, 0));
        };
        let settled = bson::to_bson(&SettlementState::Settled)?;
        let result = self
            .collection(PAYMENTS)
            .update_one(filter, doc! { "$set": { "settlement": settled } })
            .await?;
        Ok(UpdateResult::new(result.matched_count, result.modified_count))
    }

    async fn pending_payments(&self) -> Result<Vec<PaymentRecord>, DatabaseError> {
        let pending = bson::to_bson(&SettlementState::Pending)?;
        self.find_all(PAYMENTS, doc! { "settlement": pending }).await
    }

    async fn estimated_counts(&self) -> Result<CollectionCounts, DatabaseError> {
        Ok(CollectionCounts {
            users: self.collection(USERS).estimated_document_count().await?,
            menu_items: self.collection(MENU).estimated_document_count().await?,
            payments: self.collection(PAYMENTS).estimated_document_count().await?,
        })
    }

    async fn total_revenue(&self) -> Result<Decimal, DatabaseError> {
        let pipeline = vec![doc! { "$group": { "_id": Bson::Null, "total": { "$sum": "$price" } } }];
        let mut cursor = self.collection(PAYMENTS).aggregate(pipeline).await?;

        let Some(group) = cursor.try_next().await? else {
            return Ok(Decimal::ZERO);
        };
        let total = match group.get("total") {
            Some(Bson::Double(v)) => Decimal::from_f64(*v),
            Some(Bson::Int32(v)) => Some(Decimal::from(*v)),
            Some(Bson::Int64(v)) => Some(Decimal::from(*v)),
            _ => Some(Decimal::ZERO),
        };
        total
            .map(|t| t.round_dp(2))
            .ok_or_else(|| DatabaseError::Serialization("revenue total is not a finite number".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn stored_documents_expose_hex_ids() {
        let oid = ObjectId::new();
        let document = doc! {
            "_id": oid,
            "email": "a@x.com",
            "menuItemId": "m1",
            "price": 12.5,
            "quantity": 2,
        };

        let entry: CartEntry = from_stored(document).unwrap();
        assert_eq!(entry.id.as_deref(), Some(oid.to_hex().as_str()));
        assert_eq!(entry.price, Decimal::new(125, 1));
        assert_eq!(entry.quantity, 2);
    }

    #[test]
    fn storage_never_writes_client_ids() {
        let user = User {
            id: Some("64b7f0c2e4b0a1a2b3c4d5e6".to_string()),
            name: None,
            email: "a@x.com".to_string(),
            photo_url: None,
            role: Role::Admin,
        };

        let document = to_stored(&user).unwrap();
        assert!(document.get("_id").is_none());
        assert_eq!(document.get_str("role").unwrap(), "admin");
    }

    #[test]
    fn malformed_ids_build_no_filter() {
        assert!(object_id_filter("abc").is_none());
        assert!(object_id_filter(&ObjectId::new().to_hex()).is_some());
    }
}
