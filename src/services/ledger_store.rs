use crate::models::deposit::{DepositIntent, NewDepositIntent, PixStatus};
use crate::models::ledger::{
    Account, NewTransaction, Transaction, TransactionStatus, CURRENCY_BRL,
};
use crate::services::error::PixError;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Durable state for deposit intents, wallet accounts and the transaction log.
///
/// `mark_processed` and `credit_account` must each be a single atomic write
/// in the backing store; the reconciliation engine relies on that and takes
/// no locks of its own.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_intent(&self, intent: NewDepositIntent) -> Result<DepositIntent, PixError>;

    async fn find_intent_by_charge_id(
        &self,
        pix_id: &str,
    ) -> Result<Option<DepositIntent>, PixError>;

    /// `processed = true, status = PAID where id = ? and processed = false`.
    /// Returns whether a row changed.
    async fn mark_processed(&self, intent_id: Uuid) -> Result<bool, PixError>;

    /// `balance = balance + amount` on the user's active account.
    async fn credit_account(&self, user_id: &str, amount_cents: u64) -> Result<Account, PixError>;

    async fn append_transaction(&self, tx: NewTransaction) -> Result<Transaction, PixError>;

    async fn open_account(&self, user_id: &str) -> Result<Account, PixError>;

    async fn find_account(&self, user_id: &str) -> Result<Option<Account>, PixError>;

    async fn set_account_active(&self, user_id: &str, active: bool) -> Result<Account, PixError>;

    /// Newest first.
    async fn transactions_for_account(&self, account_id: Uuid)
        -> Result<Vec<Transaction>, PixError>;
}

pub type IntentStorage = Arc<DashMap<Uuid, DepositIntent>>;

/// DashMap-backed ledger. Each conditional write happens while holding the
/// shard write lock for its key.
#[derive(Default)]
pub struct InMemoryLedger {
    intents: IntentStorage,
    intents_by_pix_id: DashMap<String, Uuid>,
    accounts: DashMap<String, Account>,
    transactions: DashMap<Uuid, Transaction>,
    transactions_by_intent: DashMap<Uuid, Uuid>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn create_intent(&self, new: NewDepositIntent) -> Result<DepositIntent, PixError> {
        let id = match self.intents_by_pix_id.entry(new.pix_id.clone()) {
            Entry::Occupied(_) => return Err(PixError::DuplicateIntent(new.pix_id)),
            Entry::Vacant(slot) => {
                let id = Uuid::new_v4();
                slot.insert(id);
                id
            }
        };

        let now = Utc::now();
        let intent = DepositIntent {
            id,
            pix_id: new.pix_id,
            user_id: new.user_id,
            amount_cents: new.amount_cents,
            description: new.description,
            br_code: new.br_code,
            br_code_base64: new.br_code_base64,
            expires_at: new.expires_at,
            status: new.status,
            processed: false,
            created_at: now,
            updated_at: now,
        };

        self.intents.insert(id, intent.clone());
        debug!(pix_id = %intent.pix_id, intent_id = %id, "Deposit intent stored");
        Ok(intent)
    }

    async fn find_intent_by_charge_id(
        &self,
        pix_id: &str,
    ) -> Result<Option<DepositIntent>, PixError> {
        let Some(id) = self.intents_by_pix_id.get(pix_id).map(|entry| *entry) else {
            return Ok(None);
        };
        Ok(self.intents.get(&id).map(|entry| entry.clone()))
    }

    async fn mark_processed(&self, intent_id: Uuid) -> Result<bool, PixError> {
        let Some(mut intent) = self.intents.get_mut(&intent_id) else {
            return Ok(false);
        };

        if intent.processed {
            return Ok(false);
        }

        intent.processed = true;
        intent.status = PixStatus::Paid;
        intent.updated_at = Utc::now();
        Ok(true)
    }

    async fn credit_account(&self, user_id: &str, amount_cents: u64) -> Result<Account, PixError> {
        let mut account = self
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| PixError::AccountNotFound(user_id.to_string()))?;

        if !account.active {
            return Err(PixError::AccountInactive(user_id.to_string()));
        }

        account.balance_cents = account
            .balance_cents
            .checked_add(amount_cents)
            .ok_or_else(|| PixError::Validation("balance overflow".to_string()))?;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn append_transaction(&self, new: NewTransaction) -> Result<Transaction, PixError> {
        let id = Uuid::new_v4();

        if let Some(intent_id) = new.deposit_intent_id {
            match self.transactions_by_intent.entry(intent_id) {
                Entry::Occupied(_) => return Err(PixError::DuplicateTransaction(intent_id)),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }

        let tx = Transaction {
            id,
            account_id: new.account_id,
            deposit_intent_id: new.deposit_intent_id,
            amount_cents: new.amount_cents,
            kind: new.kind,
            description: new.description,
            status: TransactionStatus::Completed,
            currency: CURRENCY_BRL.to_string(),
            created_at: Utc::now(),
        };

        self.transactions.insert(id, tx.clone());
        Ok(tx)
    }

    async fn open_account(&self, user_id: &str) -> Result<Account, PixError> {
        let account = self
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| {
                info!(user_id = %user_id, "Opening PriveBank account");
                let now = Utc::now();
                Account {
                    id: Uuid::new_v4(),
                    user_id: user_id.to_string(),
                    balance_cents: 0,
                    currency: CURRENCY_BRL.to_string(),
                    active: true,
                    created_at: now,
                    updated_at: now,
                }
            })
            .clone();
        Ok(account)
    }

    async fn find_account(&self, user_id: &str) -> Result<Option<Account>, PixError> {
        Ok(self.accounts.get(user_id).map(|entry| entry.clone()))
    }

    async fn set_account_active(&self, user_id: &str, active: bool) -> Result<Account, PixError> {
        let mut account = self
            .accounts
            .get_mut(user_id)
            .ok_or_else(|| PixError::AccountNotFound(user_id.to_string()))?;
        account.active = active;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn transactions_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<Transaction>, PixError> {
        let mut txs: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .map(|entry| entry.clone())
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ledger::TransactionKind;
    use chrono::Duration;

    fn new_intent(pix_id: &str) -> NewDepositIntent {
        NewDepositIntent {
            pix_id: pix_id.to_string(),
            user_id: "user-1".to_string(),
            amount_cents: 5000,
            description: "Depósito".to_string(),
            br_code: "00020126".to_string(),
            br_code_base64: "data:image/png;base64,AAA".to_string(),
            expires_at: Utc::now() + Duration::seconds(1800),
            status: PixStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_intent() {
        let ledger = InMemoryLedger::new();
        let created = ledger.create_intent(new_intent("pix_1")).await.unwrap();
        assert!(!created.processed);

        let found = ledger.find_intent_by_charge_id("pix_1").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(ledger.find_intent_by_charge_id("pix_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_pix_id_is_rejected() {
        let ledger = InMemoryLedger::new();
        ledger.create_intent(new_intent("pix_1")).await.unwrap();
        let err = ledger.create_intent(new_intent("pix_1")).await.unwrap_err();
        assert!(matches!(err, PixError::DuplicateIntent(id) if id == "pix_1"));
        assert_eq!(ledger.intent_count(), 1);
    }

    #[tokio::test]
    async fn test_mark_processed_only_once() {
        let ledger = InMemoryLedger::new();
        let intent = ledger.create_intent(new_intent("pix_1")).await.unwrap();

        assert!(ledger.mark_processed(intent.id).await.unwrap());
        assert!(!ledger.mark_processed(intent.id).await.unwrap());
        assert!(!ledger.mark_processed(Uuid::new_v4()).await.unwrap());

        let stored = ledger.find_intent_by_charge_id("pix_1").await.unwrap().unwrap();
        assert!(stored.processed);
        assert_eq!(stored.status, PixStatus::Paid);
    }

    #[tokio::test]
    async fn test_credit_requires_active_account() {
        let ledger = InMemoryLedger::new();
        assert!(matches!(
            ledger.credit_account("user-1", 100).await,
            Err(PixError::AccountNotFound(_))
        ));

        ledger.open_account("user-1").await.unwrap();
        let account = ledger.credit_account("user-1", 100).await.unwrap();
        assert_eq!(account.balance_cents, 100);

        ledger.set_account_active("user-1", false).await.unwrap();
        assert!(matches!(
            ledger.credit_account("user-1", 100).await,
            Err(PixError::AccountInactive(_))
        ));
        let account = ledger.find_account("user-1").await.unwrap().unwrap();
        assert_eq!(account.balance_cents, 100);
    }

    #[tokio::test]
    async fn test_open_account_is_idempotent() {
        let ledger = InMemoryLedger::new();
        let first = ledger.open_account("user-1").await.unwrap();
        ledger.credit_account("user-1", 250).await.unwrap();
        let second = ledger.open_account("user-1").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.balance_cents, 250);
    }

    #[tokio::test]
    async fn test_one_transaction_per_intent() {
        let ledger = InMemoryLedger::new();
        let account = ledger.open_account("user-1").await.unwrap();
        let intent_id = Uuid::new_v4();

        let tx = NewTransaction {
            account_id: account.id,
            deposit_intent_id: Some(intent_id),
            amount_cents: 5000,
            kind: TransactionKind::DepositPix,
            description: "Depósito via PIX".to_string(),
        };
        ledger.append_transaction(tx.clone()).await.unwrap();
        assert!(matches!(
            ledger.append_transaction(tx).await,
            Err(PixError::DuplicateTransaction(id)) if id == intent_id
        ));

        let txs = ledger.transactions_for_account(account.id).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].status, TransactionStatus::Completed);
        assert_eq!(txs[0].currency, "BRL");
    }
}
