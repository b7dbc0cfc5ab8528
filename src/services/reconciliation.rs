use crate::models::api::{CustomerInfo, SettleOutcome};
use crate::models::deposit::{DepositIntent, NewDepositIntent, PixStatus};
use crate::models::ledger::{NewTransaction, TransactionKind};
use crate::services::abacatepay_client::{ChargeRequest, PixGateway};
use crate::services::atomic_metrics::AtomicMetrics;
use crate::services::error::PixError;
use crate::services::ledger_store::LedgerStore;
use crate::utils::money::{format_brl, signed_centavos, MAX_AMOUNT_CENTS};
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_DESCRIPTION: &str = "Depósito PriveBank";

#[derive(Debug, Clone)]
pub struct CreateDeposit {
    pub amount_cents: u64,
    pub description: Option<String>,
    pub customer: Option<CustomerInfo>,
    pub external_id: Option<String>,
}

/// Where the status fed into the settle step came from.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusSource {
    /// Client-initiated recheck: ask the gateway.
    Poll,
    /// Authenticated webhook: the payload already carries the status.
    Webhook(PixStatus),
}

/// Creates PIX deposit intents and settles paid ones into the wallet, exactly once.
///
/// Both the client recheck and the gateway webhook go through
/// [`ReconciliationEngine::check_and_settle`]; the only guard against a double
/// credit is the store's conditional `mark_processed` write.
pub struct ReconciliationEngine {
    gateway: Arc<dyn PixGateway>,
    ledger: Arc<dyn LedgerStore>,
    metrics: Arc<AtomicMetrics>,
}

impl ReconciliationEngine {
    pub fn new(
        gateway: Arc<dyn PixGateway>,
        ledger: Arc<dyn LedgerStore>,
        metrics: Arc<AtomicMetrics>,
    ) -> Self {
        Self {
            gateway,
            ledger,
            metrics,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    pub async fn create(
        &self,
        user_id: &str,
        request: CreateDeposit,
    ) -> Result<DepositIntent, PixError> {
        if request.amount_cents == 0 {
            return Err(PixError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        if request.amount_cents > MAX_AMOUNT_CENTS {
            return Err(PixError::Validation("amount out of range".to_string()));
        }

        let description = request
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        let charge = self
            .gateway
            .create_charge(&ChargeRequest {
                amount_cents: request.amount_cents,
                description: description.clone(),
                customer: request.customer,
                external_id: request.external_id,
            })
            .await?;

        if charge.amount_cents != request.amount_cents {
            warn!(
                pix_id = %charge.id,
                requested = request.amount_cents,
                charged = charge.amount_cents,
                "Gateway charged a different amount than requested"
            );
        }

        let intent = self
            .ledger
            .create_intent(NewDepositIntent {
                pix_id: charge.id,
                user_id: user_id.to_string(),
                amount_cents: request.amount_cents,
                description,
                br_code: charge.br_code,
                br_code_base64: charge.br_code_base64,
                expires_at: charge.expires_at,
                status: charge.status,
            })
            .await?;

        self.metrics.increment_created();
        info!(
            pix_id = %intent.pix_id,
            user_id = %user_id,
            amount_cents = intent.amount_cents,
            "Deposit intent created"
        );
        Ok(intent)
    }

    pub async fn find_intent(&self, pix_id: &str) -> Result<Option<DepositIntent>, PixError> {
        self.ledger.find_intent_by_charge_id(pix_id).await
    }

    pub async fn check_and_settle(
        &self,
        pix_id: &str,
        source: StatusSource,
    ) -> Result<SettleOutcome, PixError> {
        let status = match source {
            StatusSource::Poll => self.gateway.check_status(pix_id).await?,
            StatusSource::Webhook(status) => status,
        };

        if !status.is_paid() {
            return Ok(SettleOutcome::unpaid(status));
        }

        let intent = match self.ledger.find_intent_by_charge_id(pix_id).await? {
            Some(intent) if !intent.processed => intent,
            _ => {
                self.metrics.increment_already_processed();
                info!(pix_id = %pix_id, "Deposit already processed or not found");
                return Ok(SettleOutcome::already_processed());
            }
        };

        if !self.ledger.mark_processed(intent.id).await? {
            // Outra chamada (webhook ou poll) ganhou a corrida
            self.metrics.increment_already_processed();
            info!(pix_id = %pix_id, "Deposit settled concurrently, skipping credit");
            return Ok(SettleOutcome::already_processed());
        }

        // Daqui em diante o intent está marcado: falhas não desfazem a marca.
        if let Err(e) = self.credit(&intent).await {
            self.metrics.increment_settle_failures();
            error!(
                pix_id = %intent.pix_id,
                user_id = %intent.user_id,
                amount_cents = intent.amount_cents,
                "Deposit marked processed but credit failed, manual reconciliation required: {}",
                e
            );
            return Err(e);
        }

        self.metrics.increment_settled();
        info!(
            pix_id = %intent.pix_id,
            user_id = %intent.user_id,
            amount_cents = intent.amount_cents,
            "Deposit settled"
        );
        Ok(SettleOutcome::settled(intent.amount_cents, intent.user_id))
    }

    async fn credit(&self, intent: &DepositIntent) -> Result<(), PixError> {
        // Valida antes de tocar no saldo: saldo só muda junto com uma transação
        let amount = signed_centavos(intent.amount_cents)?;

        let account = self
            .ledger
            .credit_account(&intent.user_id, intent.amount_cents)
            .await?;

        self.ledger
            .append_transaction(NewTransaction {
                account_id: account.id,
                deposit_intent_id: Some(intent.id),
                amount_cents: amount,
                kind: TransactionKind::DepositPix,
                description: format!("Depósito via PIX - {}", format_brl(intent.amount_cents)),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api::NOTE_ALREADY_PROCESSED;
    use crate::services::abacatepay_client::{require_tax_id, Charge};
    use crate::services::ledger_store::InMemoryLedger;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubGateway {
        status: Mutex<PixStatus>,
        creates: AtomicUsize,
    }

    impl StubGateway {
        fn new() -> Self {
            Self {
                status: Mutex::new(PixStatus::Pending),
                creates: AtomicUsize::new(0),
            }
        }

        fn set_status(&self, status: PixStatus) {
            *self.status.lock().unwrap() = status;
        }
    }

    #[async_trait]
    impl PixGateway for StubGateway {
        async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, PixError> {
            require_tax_id(request.customer.as_ref())?;
            let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Charge {
                id: format!("pix_{}", n),
                status: PixStatus::Pending,
                amount_cents: request.amount_cents,
                br_code: "00020126".to_string(),
                br_code_base64: "data:image/png;base64,AAA".to_string(),
                expires_at: Utc::now() + Duration::seconds(1800),
            })
        }

        async fn check_status(&self, _charge_id: &str) -> Result<PixStatus, PixError> {
            Ok(self.status.lock().unwrap().clone())
        }
    }

    fn customer() -> Option<CustomerInfo> {
        Some(CustomerInfo {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            cellphone: "11999999999".into(),
            tax_id: "123.456.789-00".into(),
        })
    }

    fn deposit(amount_cents: u64) -> CreateDeposit {
        CreateDeposit {
            amount_cents,
            description: None,
            customer: customer(),
            external_id: None,
        }
    }

    fn engine() -> (ReconciliationEngine, Arc<StubGateway>, Arc<InMemoryLedger>, Arc<AtomicMetrics>) {
        let gateway = Arc::new(StubGateway::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let metrics = Arc::new(AtomicMetrics::new());
        let engine = ReconciliationEngine::new(gateway.clone(), ledger.clone(), metrics.clone());
        (engine, gateway, ledger, metrics)
    }

    #[tokio::test]
    async fn test_zero_amount_is_rejected_before_gateway() {
        let (engine, gateway, ledger, _) = engine();
        let err = engine.create("user-1", deposit(0)).await.unwrap_err();
        assert!(matches!(err, PixError::Validation(_)));
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.intent_count(), 0);
    }

    #[tokio::test]
    async fn test_amount_beyond_ledger_range_is_rejected_before_gateway() {
        let (engine, gateway, ledger, _) = engine();
        let err = engine
            .create("user-1", deposit(MAX_AMOUNT_CENTS + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PixError::Validation(_)));
        assert_eq!(gateway.creates.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.intent_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_intent_never_moves_balance_without_transaction() {
        let (engine, _, ledger, metrics) = engine();
        ledger.open_account("user-1").await.unwrap();
        // Registro gravado por fora do engine, sem a validação de create
        let intent = ledger
            .create_intent(NewDepositIntent {
                pix_id: "pix_big".to_string(),
                user_id: "user-1".to_string(),
                amount_cents: MAX_AMOUNT_CENTS + 1,
                description: DEFAULT_DESCRIPTION.to_string(),
                br_code: "00020126".to_string(),
                br_code_base64: "data:image/png;base64,AAA".to_string(),
                expires_at: Utc::now() + Duration::seconds(1800),
                status: PixStatus::Pending,
            })
            .await
            .unwrap();

        let err = engine
            .check_and_settle(&intent.pix_id, StatusSource::Webhook(PixStatus::Paid))
            .await
            .unwrap_err();
        assert!(matches!(err, PixError::Validation(_)));

        let account = ledger.find_account("user-1").await.unwrap().unwrap();
        assert_eq!(account.balance_cents, 0);
        assert_eq!(ledger.transaction_count(), 0);
        assert_eq!(metrics.snapshot().settle_failures, 1);
    }

    #[tokio::test]
    async fn test_create_uses_default_description() {
        let (engine, _, _, metrics) = engine();
        let intent = engine.create("user-1", deposit(5000)).await.unwrap();
        assert_eq!(intent.description, DEFAULT_DESCRIPTION);
        assert_eq!(intent.status, PixStatus::Pending);
        assert_eq!(metrics.snapshot().deposits_created, 1);
    }

    #[tokio::test]
    async fn test_unknown_status_is_surfaced_without_mutation() {
        let (engine, gateway, ledger, _) = engine();
        ledger.open_account("user-1").await.unwrap();
        let intent = engine.create("user-1", deposit(5000)).await.unwrap();

        gateway.set_status(PixStatus::from("REFUNDED"));
        let outcome = engine
            .check_and_settle(&intent.pix_id, StatusSource::Poll)
            .await
            .unwrap();
        assert_eq!(outcome, SettleOutcome::unpaid(PixStatus::Unknown("REFUNDED".into())));
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_charge_is_not_an_error() {
        let (engine, _, _, metrics) = engine();
        let outcome = engine
            .check_and_settle("pix_missing", StatusSource::Webhook(PixStatus::Paid))
            .await
            .unwrap();
        assert!(!outcome.processed);
        assert_eq!(outcome.note, Some(NOTE_ALREADY_PROCESSED));
        assert_eq!(metrics.snapshot().already_processed, 1);
    }

    #[tokio::test]
    async fn test_credit_failure_keeps_intent_processed() {
        let (engine, _, ledger, metrics) = engine();
        let intent = engine.create("user-1", deposit(5000)).await.unwrap();

        let err = engine
            .check_and_settle(&intent.pix_id, StatusSource::Webhook(PixStatus::Paid))
            .await
            .unwrap_err();
        assert!(matches!(err, PixError::AccountNotFound(_)));

        let stored = ledger
            .find_intent_by_charge_id(&intent.pix_id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.processed);
        assert_eq!(ledger.transaction_count(), 0);
        assert_eq!(metrics.snapshot().settle_failures, 1);

        // Abrir a conta depois não credita de novo: exige conciliação manual
        ledger.open_account("user-1").await.unwrap();
        let outcome = engine
            .check_and_settle(&intent.pix_id, StatusSource::Poll)
            .await;
        assert!(outcome.is_ok());
        let account = ledger.find_account("user-1").await.unwrap().unwrap();
        assert_eq!(account.balance_cents, 0);
    }
}
