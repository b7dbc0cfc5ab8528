use crate::app::config::Config;
use crate::models::api::CustomerInfo;
use crate::models::deposit::PixStatus;
use crate::services::error::PixError;
use crate::utils::tax_id;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

/// Janela fixa de expiração do QR Code (30 minutos).
pub const CHARGE_EXPIRES_IN_SECS: u64 = 1800;

// Limite do gateway para a mensagem exibida no app do banco
const MAX_DESCRIPTION_CHARS: usize = 37;

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount_cents: u64,
    pub description: String,
    pub customer: Option<CustomerInfo>,
    pub external_id: Option<String>,
}

/// A charge as created by the gateway, already normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct Charge {
    pub id: String,
    pub status: PixStatus,
    pub amount_cents: u64,
    pub br_code: String,
    pub br_code_base64: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait PixGateway: Send + Sync {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, PixError>;
    async fn check_status(&self, charge_id: &str) -> Result<PixStatus, PixError>;
}

/// Fails before any I/O when the customer carries no usable CPF/CNPJ.
pub fn require_tax_id(customer: Option<&CustomerInfo>) -> Result<&CustomerInfo, PixError> {
    match customer {
        Some(customer) if tax_id::is_usable(&customer.tax_id) => Ok(customer),
        _ => Err(PixError::Validation("tax id required".to_string())),
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Data { data: T },
    Error { error: Value },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCharge {
    id: String,
    amount: u64,
    status: String,
    br_code: String,
    br_code_base64: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCustomer<'a> {
    name: &'a str,
    cellphone: &'a str,
    email: &'a str,
    tax_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata<'a> {
    external_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePayload<'a> {
    amount: u64,
    expires_in: u64,
    description: String,
    customer: WireCustomer<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<WireMetadata<'a>>,
}

impl From<WireCharge> for Charge {
    fn from(wire: WireCharge) -> Self {
        Self {
            id: wire.id,
            status: PixStatus::from(wire.status),
            amount_cents: wire.amount,
            br_code: wire.br_code,
            br_code_base64: wire.br_code_base64,
            expires_at: wire.expires_at,
        }
    }
}

fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AbacatePayClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AbacatePayClient {
    pub fn new(config: &Config) -> Result<Self, PixError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.gateway_timeout_ms))
            .build()
            .map_err(|e| PixError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.abacatepay_api_url.trim_end_matches('/').to_string(),
            api_key: config.abacatepay_api_key.clone(),
        })
    }

    async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, PixError> {
        let status = response.status();
        let text = response.text().await.map_err(PixError::transport)?;
        // Erros de proxy às vezes vêm em HTML; guardamos o texto cru como payload
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(PixError::Gateway {
                status: Some(status.as_u16()),
                message,
                payload: Some(body),
            });
        }

        match serde_json::from_value::<Envelope<T>>(body.clone()) {
            Ok(Envelope::Data { data }) => Ok(data),
            Ok(Envelope::Error { error }) => Err(PixError::Gateway {
                status: Some(status.as_u16()),
                message: error
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string()),
                payload: Some(body),
            }),
            Err(e) => Err(PixError::Gateway {
                status: Some(status.as_u16()),
                message: format!("unexpected gateway response: {}", e),
                payload: Some(body),
            }),
        }
    }
}

#[async_trait]
impl PixGateway for AbacatePayClient {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, PixError> {
        let customer = require_tax_id(request.customer.as_ref())?;

        let payload = CreatePayload {
            amount: request.amount_cents,
            expires_in: CHARGE_EXPIRES_IN_SECS,
            description: truncate_description(&request.description),
            customer: WireCustomer {
                name: &customer.name,
                cellphone: &customer.cellphone,
                email: &customer.email,
                tax_id: &customer.tax_id,
            },
            metadata: request
                .external_id
                .as_deref()
                .map(|external_id| WireMetadata { external_id }),
        };

        let response = self
            .client
            .post(format!("{}/v1/pixQrCode/create", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("PIX charge request failed: {}", e);
                PixError::transport(e)
            })?;

        let charge: Charge = Self::read_envelope::<WireCharge>(response)
            .await
            .map_err(|e| {
                warn!("Gateway rejected PIX charge: {}", e);
                e
            })?
            .into();

        info!(
            pix_id = %charge.id,
            amount_cents = charge.amount_cents,
            status = %charge.status,
            "PIX charge created"
        );
        Ok(charge)
    }

    async fn check_status(&self, charge_id: &str) -> Result<PixStatus, PixError> {
        let response = self
            .client
            .get(format!("{}/v1/pixQrCode/check", self.base_url))
            .query(&[("id", charge_id)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                error!(pix_id = %charge_id, "PIX status request failed: {}", e);
                PixError::transport(e)
            })?;

        let wire = Self::read_envelope::<WireStatus>(response).await?;
        Ok(PixStatus::from(wire.status))
    }
}
