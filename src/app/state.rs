use crate::app::config::Config;
use crate::services::{
    AbacatePayClient, Authenticator, InMemoryLedger, LedgerStore, PixError, PixGateway,
    ReconciliationEngine, StaticTokenAuthenticator,
};
use crate::services::atomic_metrics::AtomicMetrics;
use std::sync::Arc;

pub struct AppState {
    pub engine: ReconciliationEngine,
    pub authenticator: Arc<dyn Authenticator>,
    pub webhook_secret: String,
    pub metrics: Arc<AtomicMetrics>,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn PixGateway>,
        ledger: Arc<dyn LedgerStore>,
        authenticator: Arc<dyn Authenticator>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        let metrics = Arc::new(AtomicMetrics::new());
        Self {
            engine: ReconciliationEngine::new(gateway, ledger, metrics.clone()),
            authenticator,
            webhook_secret: webhook_secret.into(),
            metrics,
        }
    }

    /// Production wiring: AbacatePay client, in-memory ledger, token table from config.
    pub fn from_config(config: &Config) -> Result<Self, PixError> {
        let gateway = Arc::new(AbacatePayClient::new(config)?);
        let ledger = Arc::new(InMemoryLedger::new());
        let authenticator = Arc::new(StaticTokenAuthenticator::new(config.api_tokens.clone()));
        Ok(Self::new(
            gateway,
            ledger,
            authenticator,
            config.webhook_secret.clone(),
        ))
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        self.engine.ledger()
    }
}
