use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tokio::sync::RwLock;

use super::models::{CartEntry, MenuItem, PaymentRecord, Review, Role, SettlementState, User};
use super::{
    new_id, parse_id, CollectionCounts, DatabaseError, DeleteResult, InsertResult, Store, UpdateResult,
};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    menu: Vec<MenuItem>,
    reviews: Vec<Review>,
    cart: Vec<CartEntry>,
    payments: Vec<PaymentRecord>,
}

/// In-process store for development and tests. Documents keep insertion
/// order and receive ObjectId-shaped ids, so handlers behave as they do
/// against MongoDB.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn remove_cart_entries(&self, owner: Option<&str>, ids: &[String]) -> DeleteResult {
        let wanted: HashSet<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| parse_id(id).is_some())
            .collect();

        let mut inner = self.inner.write().await;
        let before = inner.cart.len();
        inner.cart.retain(|c| {
            let listed = c.id.as_deref().is_some_and(|id| wanted.contains(id));
            let owned = owner.map_or(true, |email| c.email == email);
            !(listed && owned)
        });
        DeleteResult::new((before - inner.cart.len()) as u64)
    }

    /// Reviews have no write route; this seeds them.
    pub async fn insert_review(&self, mut review: Review) -> InsertResult {
        let id = new_id();
        review.id = Some(id.clone());
        self.inner.write().await.reviews.push(review);
        InsertResult::new(id)
    }

    pub async fn payments(&self) -> Vec<PaymentRecord> {
        self.inner.read().await.payments.clone()
    }
}

fn assign_id(id: &mut Option<String>) -> String {
    let assigned = new_id();
    *id = Some(assigned.clone());
    assigned
}

fn matches_id(stored: &Option<String>, id: &str) -> bool {
    stored.as_deref() == Some(id)
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn shutdown(&self) {}

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        Ok(self.inner.read().await.users.clone())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, mut user: User) -> Result<InsertResult, DatabaseError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate(format!("user {} already exists", user.email)));
        }
        let id = assign_id(&mut user.id);
        inner.users.push(user);
        Ok(InsertResult::new(id))
    }

    async fn set_user_role(&self, id: &str, role: Role) -> Result<UpdateResult, DatabaseError> {
        let mut inner = self.inner.write().await;
        match inner.users.iter_mut().find(|u| matches_id(&u.id, id)) {
            Some(user) => {
                let modified = u64::from(user.role != role);
                user.role = role;
                Ok(UpdateResult::new(1, modified))
            }
            None => Ok(UpdateResult::new(0, 0)),
        }
    }

    async fn list_menu(&self) -> Result<Vec<MenuItem>, DatabaseError> {
        Ok(self.inner.read().await.menu.clone())
    }

    async fn insert_menu_item(&self, mut item: MenuItem) -> Result<InsertResult, DatabaseError> {
        let id = assign_id(&mut item.id);
        self.inner.write().await.menu.push(item);
        Ok(InsertResult::new(id))
    }

    async fn delete_menu_item(&self, id: &str) -> Result<DeleteResult, DatabaseError> {
        let mut inner = self.inner.write().await;
        match inner.menu.iter().position(|m| matches_id(&m.id, id)) {
            Some(index) => {
                inner.menu.remove(index);
                Ok(DeleteResult::new(1))
            }
            None => Ok(DeleteResult::new(0)),
        }
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, DatabaseError> {
        Ok(self.inner.read().await.reviews.clone())
    }

    async fn find_cart(&self, email: &str) -> Result<Vec<CartEntry>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.cart.iter().filter(|c| c.email == email).cloned().collect())
    }

    async fn insert_cart_entry(&self, mut entry: CartEntry) -> Result<InsertResult, DatabaseError> {
        let id = assign_id(&mut entry.id);
        self.inner.write().await.cart.push(entry);
        Ok(InsertResult::new(id))
    }

    async fn delete_cart_entry(&self, id: &str) -> Result<DeleteResult, DatabaseError> {
        Ok(self.remove_cart_entries(None, &[id.to_string()]).await)
    }

    async fn delete_cart_entries(&self, email: &str, ids: &[String]) -> Result<DeleteResult, DatabaseError> {
        Ok(self.remove_cart_entries(Some(email), ids).await)
    }

    async fn insert_payment(&self, mut record: PaymentRecord) -> Result<InsertResult, DatabaseError> {
        let id = assign_id(&mut record.id);
        self.inner.write().await.payments.push(record);
        Ok(InsertResult::new(id))
    }

    async fn mark_payment_settled(&self, id: &str) -> Result<UpdateResult, DatabaseError> {
        let mut inner = self.inner.write().await;
        match inner.payments.iter_mut().find(|p| matches_id(&p.id, id)) {
            Some(payment) => {
                let modified = u64::from(payment.settlement != SettlementState::Settled);
                payment.settlement = SettlementState::Settled;
                Ok(UpdateResult::new(1, modified))
            }
            None => Ok(UpdateResult::new(0, 0)),
        }
    }

    async fn pending_payments(&self) -> Result<Vec<PaymentRecord>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .iter()
            .filter(|p| p.settlement == SettlementState::Pending)
            .cloned()
            .collect())
    }

    async fn estimated_counts(&self) -> Result<CollectionCounts, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(CollectionCounts {
            users: inner.users.len() as u64,
            menu_items: inner.menu.len() as u64,
            payments: inner.payments.len() as u64,
        })
    }

    async fn total_revenue(&self) -> Result<Decimal, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.payments.iter().map(|p| p.price).sum::<Decimal>().round_dp(2))
    }
}
