use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info};

use crate::app::state::AppState;
use crate::handlers::authenticate;
use crate::models::api::{
    CreateDepositRequest, CreateDepositResponse, PixAction, StatusRequest, StatusResponse,
};
use crate::services::{CreateDeposit, PixError, StatusSource};
use crate::utils::money::reais_to_centavos;

pub async fn handle_pix(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let user_id = match authenticate(&state, &headers).await {
        Ok(user_id) => user_id,
        Err(e) => return e.into_response(),
    };

    // Corpo lido cru: JSON inválido também responde com o corpo de erro padrão
    let action: PixAction = match serde_json::from_slice(&body) {
        Ok(action) => action,
        Err(e) => {
            error!("Invalid PIX request: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "invalid_request",
                    "message": e.to_string(),
                })),
            )
                .into_response();
        }
    };

    let result = match action {
        PixAction::Create(request) => create(&state, &user_id, request).await,
        PixAction::Status(request) => status(&state, &user_id, request).await,
    };

    match result {
        Ok(response) => response,
        Err(e) => {
            error!(user_id = %user_id, "PIX request failed: {}", e);
            e.into_response()
        }
    }
}

async fn create(
    state: &AppState,
    user_id: &str,
    request: CreateDepositRequest,
) -> Result<Response, PixError> {
    let amount_cents = reais_to_centavos(request.amount)?;
    info!(user_id = %user_id, amount_cents, "Creating PIX deposit");

    let intent = state
        .engine
        .create(
            user_id,
            CreateDeposit {
                amount_cents,
                description: request.description,
                customer: request.customer,
                external_id: request.metadata.and_then(|m| m.external_id),
            },
        )
        .await?;

    Ok(Json(CreateDepositResponse::from(&intent)).into_response())
}

async fn status(
    state: &AppState,
    user_id: &str,
    request: StatusRequest,
) -> Result<Response, PixError> {
    // Só o dono do depósito pode consultar (e liquidar) pelo modal
    if let Some(intent) = state.engine.find_intent(&request.pix_id).await? {
        if intent.user_id != user_id {
            return Err(PixError::NotFound(format!("deposit {}", request.pix_id)));
        }
    }

    let outcome = state
        .engine
        .check_and_settle(&request.pix_id, StatusSource::Poll)
        .await?;

    Ok(Json(StatusResponse::from(outcome)).into_response())
}
