pub mod abacatepay_client;
pub mod atomic_metrics;
pub mod auth;
pub mod error;
pub mod ledger_store;
pub mod reconciliation;

pub use abacatepay_client::{AbacatePayClient, PixGateway};
pub use auth::{Authenticator, StaticTokenAuthenticator};
pub use error::PixError;
pub use ledger_store::{InMemoryLedger, LedgerStore};
pub use reconciliation::{CreateDeposit, ReconciliationEngine, StatusSource};
