//! AbacatePay webhook ingress.
//!
//! Every request with a valid `webhookSecret` gets a `200`, whatever happens
//! next, so the gateway never retries a delivery we have already seen. Only a
//! bad secret yields `401`.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::app::state::AppState;
use crate::models::deposit::PixStatus;
use crate::services::auth::secrets_match;
use crate::services::StatusSource;

pub const BILLING_PAID_EVENT: &str = "billing.paid";

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    #[serde(rename = "webhookSecret")]
    webhook_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event: Option<String>,
    data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookData {
    pix_qr_code: Option<WebhookCharge>,
}

#[derive(Debug, Deserialize)]
struct WebhookCharge {
    id: Option<String>,
    /// Centavos.
    amount: Option<u64>,
    status: Option<String>,
}

/// The one event shape the ingress acts on.
#[derive(Debug, PartialEq)]
pub enum WebhookEvent {
    PixPaid {
        pix_id: String,
        amount_cents: Option<u64>,
    },
    Ignored {
        event: Option<String>,
    },
}

/// Parses a webhook body. `None` means empty or not JSON.
pub fn parse_event(body: &[u8]) -> Option<WebhookEvent> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let envelope: WebhookEnvelope = serde_json::from_slice(body).ok()?;

    let billing_paid = envelope.event.as_deref() == Some(BILLING_PAID_EVENT);
    let charge = envelope.data.and_then(|d| d.pix_qr_code);
    let event = match charge {
        Some(charge) if billing_paid => {
            let paid = charge
                .status
                .map(|s| PixStatus::from(s).is_paid())
                .unwrap_or(false);
            match charge.id {
                Some(pix_id) if paid && !pix_id.is_empty() => WebhookEvent::PixPaid {
                    pix_id,
                    amount_cents: charge.amount,
                },
                _ => WebhookEvent::Ignored {
                    event: envelope.event,
                },
            }
        }
        _ => WebhookEvent::Ignored {
            event: envelope.event,
        },
    };
    Some(event)
}

fn ack(body: serde_json::Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

pub async fn abacatepay_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> Response {
    let authorized = query
        .webhook_secret
        .as_deref()
        .map(|provided| secrets_match(&state.webhook_secret, provided))
        .unwrap_or(false);

    if !authorized {
        state.metrics.increment_webhooks_rejected();
        warn!("Webhook rejected: invalid secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthorized" })),
        )
            .into_response();
    }

    state.metrics.increment_webhooks_received();

    let event = match parse_event(&body) {
        Some(event) => event,
        None => {
            info!("Webhook without a usable body");
            return ack(serde_json::json!({ "received": true, "message": "no body" }));
        }
    };

    let (pix_id, amount_cents) = match event {
        WebhookEvent::PixPaid {
            pix_id,
            amount_cents,
        } => (pix_id, amount_cents),
        WebhookEvent::Ignored { event } => {
            info!(event = ?event, "Webhook received but not processed");
            return ack(serde_json::json!({
                "received": true,
                "processed": false,
                "note": "received but not processed",
            }));
        }
    };

    if let Some(reported) = amount_cents {
        match state.engine.find_intent(&pix_id).await {
            Ok(Some(intent)) if intent.amount_cents != reported => {
                warn!(
                    pix_id = %pix_id,
                    expected = intent.amount_cents,
                    reported,
                    "Webhook amount differs from deposit intent, crediting intent amount"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(pix_id = %pix_id, "Webhook amount cross-check skipped: {}", e);
            }
        }
    }

    match state
        .engine
        .check_and_settle(&pix_id, StatusSource::Webhook(PixStatus::Paid))
        .await
    {
        Ok(outcome) if outcome.processed => {
            info!(pix_id = %pix_id, "Webhook settled deposit");
            ack(serde_json::json!({ "received": true, "processed": true }))
        }
        Ok(outcome) => {
            info!(pix_id = %pix_id, "Webhook for deposit already processed");
            ack(serde_json::json!({
                "received": true,
                "processed": false,
                "note": outcome.note,
            }))
        }
        Err(e) => {
            error!(pix_id = %pix_id, "Webhook settle failed: {}", e);
            ack(serde_json::json!({
                "received": true,
                "processed": false,
                "error": e.to_string(),
            }))
        }
    }
}
