//! Shared fixtures for the scenario tests: a scriptable gateway and app wiring.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use privebank_pix::app::{build_router, AppState};
use privebank_pix::models::api::CustomerInfo;
use privebank_pix::models::deposit::PixStatus;
use privebank_pix::services::abacatepay_client::{require_tax_id, Charge, ChargeRequest};
use privebank_pix::services::{
    InMemoryLedger, PixError, PixGateway, ReconciliationEngine, StaticTokenAuthenticator,
};
use privebank_pix::services::atomic_metrics::AtomicMetrics;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const ANA_TOKEN: &str = "tok-ana";
pub const ANA: &str = "user-ana";
pub const BIA_TOKEN: &str = "tok-bia";
pub const BIA: &str = "user-bia";

/// In-process stand-in for AbacatePay. Charges start PENDING; tests flip them.
#[derive(Default)]
pub struct FakeGateway {
    statuses: Mutex<HashMap<String, PixStatus>>,
    charges_issued: AtomicUsize,
    status_checks: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, pix_id: &str, status: PixStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(pix_id.to_string(), status);
    }

    pub fn charges_issued(&self) -> usize {
        self.charges_issued.load(Ordering::SeqCst)
    }

    pub fn status_checks(&self) -> usize {
        self.status_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PixGateway for FakeGateway {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, PixError> {
        require_tax_id(request.customer.as_ref())?;

        let n = self.charges_issued.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pix_{}", n);
        self.set_status(&id, PixStatus::Pending);

        Ok(Charge {
            id,
            status: PixStatus::Pending,
            amount_cents: request.amount_cents,
            br_code: "00020126580014br.gov.bcb.pix".to_string(),
            br_code_base64: "data:image/png;base64,iVBORw0KGgo=".to_string(),
            expires_at: Utc::now() + Duration::seconds(1800),
        })
    }

    async fn check_status(&self, charge_id: &str) -> Result<PixStatus, PixError> {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .get(charge_id)
            .cloned()
            .ok_or_else(|| PixError::Gateway {
                status: Some(404),
                message: "Pix QRCode not found".to_string(),
                payload: None,
            })
    }
}

pub fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Ana Souza".to_string(),
        email: "ana@example.com".to_string(),
        cellphone: "(11) 99999-0000".to_string(),
        tax_id: "123.456.789-00".to_string(),
    }
}

pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub ledger: Arc<InMemoryLedger>,
    pub state: Arc<AppState>,
}

impl Harness {
    pub fn new() -> Self {
        let gateway = Arc::new(FakeGateway::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let authenticator = Arc::new(StaticTokenAuthenticator::new(HashMap::from([
            (ANA_TOKEN.to_string(), ANA.to_string()),
            (BIA_TOKEN.to_string(), BIA.to_string()),
        ])));
        let state = Arc::new(AppState::new(
            gateway.clone(),
            ledger.clone(),
            authenticator,
            WEBHOOK_SECRET,
        ));
        Self {
            gateway,
            ledger,
            state,
        }
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.state.engine
    }

    pub fn metrics(&self) -> &AtomicMetrics {
        &self.state.metrics
    }

    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    pub async fn call(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = self.router().oneshot(req).await.expect("oneshot failed");
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .expect("body collect failed")
            .to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is not valid JSON")
        };
        (status, json)
    }
}

pub fn pix_request(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/pix")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn webhook_request(secret: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let uri = match secret {
        Some(secret) => format!("/webhooks/abacatepay?webhookSecret={}", secret),
        None => "/webhooks/abacatepay".to_string(),
    };
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub fn billing_paid(pix_id: &str, amount_cents: u64) -> serde_json::Value {
    serde_json::json!({
        "id": "log_abc",
        "event": "billing.paid",
        "devMode": false,
        "data": {
            "pixQrCode": {
                "id": pix_id,
                "amount": amount_cents,
                "kind": "PIX",
                "status": "PAID"
            },
            "payment": { "amount": amount_cents, "fee": 80, "method": "PIX" }
        }
    })
}
