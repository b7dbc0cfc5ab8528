use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PixError {
    #[error("{0}")]
    Validation(String),

    /// Upstream failure. `status` is `None` when the request never got a response.
    #[error("payment gateway error: {message}")]
    Gateway {
        status: Option<u16>,
        message: String,
        payload: Option<Value>,
    },

    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("no account for user {0}")]
    AccountNotFound(String),

    #[error("account for user {0} is inactive")]
    AccountInactive(String),

    #[error("deposit intent {0} already exists")]
    DuplicateIntent(String),

    #[error("deposit intent {0} already has a ledger transaction")]
    DuplicateTransaction(Uuid),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PixError {
    pub fn kind(&self) -> &'static str {
        match self {
            PixError::Validation(_) => "validation_error",
            PixError::Gateway { .. } => "gateway_error",
            PixError::Auth(_) => "unauthorized",
            PixError::NotFound(_) => "not_found",
            PixError::AccountNotFound(_) => "account_not_found",
            PixError::AccountInactive(_) => "account_inactive",
            PixError::DuplicateIntent(_) | PixError::DuplicateTransaction(_) => "conflict",
            PixError::Config(_) => "configuration_error",
        }
    }

    pub(crate) fn transport(err: reqwest::Error) -> Self {
        PixError::Gateway {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            payload: None,
        }
    }
}
