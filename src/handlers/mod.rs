pub mod bank;
pub mod metrics;
pub mod pix;
pub mod webhook;

use crate::app::state::AppState;
use crate::services::auth::bearer_token;
use crate::services::PixError;
use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::warn;

pub async fn health_handler() -> StatusCode {
    StatusCode::OK
}

impl PixError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PixError::Validation(_) => StatusCode::BAD_REQUEST,
            // 4xx do gateway normalmente é dado do cliente (ex.: taxId recusado)
            PixError::Gateway {
                status: Some(code),
                ..
            } if (400..500).contains(code) => StatusCode::BAD_REQUEST,
            PixError::Gateway { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            PixError::Auth(_) => StatusCode::UNAUTHORIZED,
            PixError::NotFound(_) | PixError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            PixError::AccountInactive(_)
            | PixError::DuplicateIntent(_)
            | PixError::DuplicateTransaction(_) => StatusCode::CONFLICT,
            PixError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PixError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(serde_json::json!({
                "error": self.kind(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Resolves the caller from the `Authorization` header.
pub(crate) async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<String, PixError> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = bearer_token(header)?;
    state.authenticator.authenticate(token).await.map_err(|e| {
        warn!("Rejected request: {}", e);
        e
    })
}
