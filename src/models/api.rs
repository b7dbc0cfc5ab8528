use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::deposit::{DepositIntent, PixStatus};
use crate::models::ledger::{Account, Transaction};
use crate::utils::money::{centavos_to_reais, signed_centavos_to_reais};

// Payload recebido do modal de depósito: `action` decide a operação
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PixAction {
    Create(CreateDepositRequest),
    Status(StatusRequest),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepositRequest {
    /// Reais, decimal.
    pub amount: f64,
    pub description: Option<String>,
    pub customer: Option<CustomerInfo>,
    pub metadata: Option<DepositMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub cellphone: String,
    #[serde(default)]
    pub tax_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositMetadata {
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub pix_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepositResponse {
    pub id: String,
    pub amount: f64,
    pub status: PixStatus,
    pub br_code: String,
    pub br_code_base64: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&DepositIntent> for CreateDepositResponse {
    fn from(intent: &DepositIntent) -> Self {
        Self {
            id: intent.pix_id.clone(),
            amount: centavos_to_reais(intent.amount_cents),
            status: intent.status.clone(),
            br_code: intent.br_code.clone(),
            br_code_base64: intent.br_code_base64.clone(),
            expires_at: intent.expires_at,
        }
    }
}

/// Result of one pass through the settle step.
#[derive(Debug, Clone, PartialEq)]
pub struct SettleOutcome {
    pub status: PixStatus,
    pub processed: bool,
    pub amount_cents: Option<u64>,
    pub user_id: Option<String>,
    pub note: Option<&'static str>,
}

pub const NOTE_ALREADY_PROCESSED: &str = "already processed or not found";

impl SettleOutcome {
    pub fn unpaid(status: PixStatus) -> Self {
        Self {
            status,
            processed: false,
            amount_cents: None,
            user_id: None,
            note: None,
        }
    }

    pub fn already_processed() -> Self {
        Self {
            status: PixStatus::Paid,
            processed: false,
            amount_cents: None,
            user_id: None,
            note: Some(NOTE_ALREADY_PROCESSED),
        }
    }

    pub fn settled(amount_cents: u64, user_id: String) -> Self {
        Self {
            status: PixStatus::Paid,
            processed: true,
            amount_cents: Some(amount_cents),
            user_id: Some(user_id),
            note: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: PixStatus,
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

impl From<SettleOutcome> for StatusResponse {
    fn from(outcome: SettleOutcome) -> Self {
        Self {
            status: outcome.status,
            processed: outcome.processed,
            amount: outcome.amount_cents.map(centavos_to_reais),
            user_id: outcome.user_id,
            note: outcome.note,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: crate::models::ledger::TransactionKind,
    pub description: String,
    pub status: crate::models::ledger::TransactionStatus,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: signed_centavos_to_reais(tx.amount_cents),
            kind: tx.kind,
            description: tx.description.clone(),
            status: tx.status,
            currency: tx.currency.clone(),
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub user_id: String,
    pub balance: f64,
    pub currency: String,
    pub active: bool,
    pub transactions: Vec<TransactionView>,
}

impl AccountView {
    pub fn new(account: &Account, transactions: &[Transaction]) -> Self {
        Self {
            user_id: account.user_id.clone(),
            balance: centavos_to_reais(account.balance_cents),
            currency: account.currency.clone(),
            active: account.active,
            transactions: transactions.iter().map(TransactionView::from).collect(),
        }
    }
}
