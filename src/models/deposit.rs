use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Status of a PIX charge as reported by the gateway.
///
/// Strings the gateway may add later are kept verbatim in `Unknown`
/// and handed back to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PixStatus {
    Pending,
    Paid,
    Expired,
    Unknown(String),
}

impl PixStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PixStatus::Pending => "PENDING",
            PixStatus::Paid => "PAID",
            PixStatus::Expired => "EXPIRED",
            PixStatus::Unknown(raw) => raw,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PixStatus::Paid)
    }
}

impl From<String> for PixStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "PENDING" => PixStatus::Pending,
            "PAID" => PixStatus::Paid,
            "EXPIRED" => PixStatus::Expired,
            _ => PixStatus::Unknown(raw),
        }
    }
}

impl From<&str> for PixStatus {
    fn from(raw: &str) -> Self {
        PixStatus::from(raw.to_string())
    }
}

impl From<PixStatus> for String {
    fn from(status: PixStatus) -> Self {
        match status {
            PixStatus::Unknown(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for PixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositIntent {
    pub id: Uuid,
    pub pix_id: String,
    pub user_id: String,
    pub amount_cents: u64,
    pub description: String,
    pub br_code: String,
    pub br_code_base64: String,
    pub expires_at: DateTime<Utc>,
    pub status: PixStatus,
    /// Set once, by the settle step, never cleared.
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new intent row, taken from the gateway's create response.
#[derive(Debug, Clone)]
pub struct NewDepositIntent {
    pub pix_id: String,
    pub user_id: String,
    pub amount_cents: u64,
    pub description: String,
    pub br_code: String,
    pub br_code_base64: String,
    pub expires_at: DateTime<Utc>,
    pub status: PixStatus,
}
