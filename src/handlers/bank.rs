use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::app::state::AppState;
use crate::handlers::authenticate;
use crate::models::api::AccountView;
use crate::services::PixError;

pub async fn open_account(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let result = async {
        let user_id = authenticate(&state, &headers).await?;
        let account = state.ledger().open_account(&user_id).await?;
        let transactions = state.ledger().transactions_for_account(account.id).await?;
        info!(user_id = %user_id, "PriveBank account ready");
        Ok::<_, PixError>(AccountView::new(&account, &transactions))
    }
    .await;

    match result {
        Ok(view) => Json(view).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_account(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let result = async {
        let user_id = authenticate(&state, &headers).await?;
        let account = state
            .ledger()
            .find_account(&user_id)
            .await?
            .ok_or_else(|| PixError::AccountNotFound(user_id.clone()))?;
        let transactions = state.ledger().transactions_for_account(account.id).await?;
        Ok::<_, PixError>(AccountView::new(&account, &transactions))
    }
    .await;

    match result {
        Ok(view) => Json(view).into_response(),
        Err(e) => e.into_response(),
    }
}
