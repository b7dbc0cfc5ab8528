use crate::app::state::AppState;
use crate::handlers::{bank, health_handler, metrics, pix, webhook};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Bare router; `main` adds the tracing layer so tests can drive it directly.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/pix", post(pix::handle_pix))
        .route("/webhooks/abacatepay", post(webhook::abacatepay_webhook))
        .route(
            "/bank/account",
            get(bank::get_account).post(bank::open_account),
        )
        .route("/metrics", get(metrics::get_metrics))
        .with_state(state)
}
