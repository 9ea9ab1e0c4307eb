use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::Store;
use crate::payments::PaymentProcessor;
use crate::services::{ReportingService, SettlementService};

/// Shared handler state. Every collaborator is injected at construction;
/// nothing is reached through process-wide globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub settlement: SettlementService,
    pub reporting: ReportingService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, processor: Arc<dyn PaymentProcessor>) -> Self {
        let tokens = TokenService::new(&config.security.jwt_secret, config.security.token_ttl_secs);
        let settlement = SettlementService::new(store.clone(), processor, config.payments.currency.clone());
        let reporting = ReportingService::new(store.clone());

        Self {
            config: Arc::new(config),
            store,
            tokens,
            settlement,
            reporting,
        }
    }
}
