use axum::{extract::State, response::Json};
use std::sync::Arc;
use crate::app::state::AppState;
use crate::services::atomic_metrics::MetricsSnapshot;

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
