use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use maxdate_core::services::accounts::AccountView;
use maxdate_shared::errors::AppResult;
use maxdate_shared::types::api::MessageBody;
use maxdate_shared::types::auth::AuthUser;
use maxdate_shared::types::ApiResponse;

use crate::AppState;

pub async fn get_me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<AccountView>>> {
    let account = state.accounts.get_account(user.id).await?;
    Ok(Json(ApiResponse::ok(account)))
}

pub async fn delete_me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MessageBody>>> {
    state.accounts.delete_account(user.id).await?;
    Ok(Json(ApiResponse::message("account deleted")))
}

pub async fn deactivate_me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MessageBody>>> {
    state.accounts.deactivate_account(user.id).await?;
    Ok(Json(ApiResponse::message("account deactivated")))
}
