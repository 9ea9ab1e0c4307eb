use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use crate::database::{DatabaseError, Store};

/// Admin dashboard figures. Counts are store estimates, not exact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStats {
    pub users: u64,
    pub products: u64,
    pub orders: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

#[derive(Clone)]
pub struct ReportingService {
    store: Arc<dyn Store>,
}

impl ReportingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, DatabaseError> {
        let counts = self.store.estimated_counts().await?;
        let revenue = self.store.total_revenue().await?;

        Ok(AdminStats {
            users: counts.users,
            products: counts.menu_items,
            orders: counts.payments,
            revenue,
        })
    }
}
