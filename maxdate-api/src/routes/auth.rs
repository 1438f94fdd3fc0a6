use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use maxdate_shared::errors::AppResult;
use maxdate_shared::types::api::MessageBody;
use maxdate_shared::types::auth::{AccessToken, AuthUser};
use maxdate_shared::types::ApiResponse;

use crate::routes::validate_request;
use crate::services::token_service;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RegisterResponse>>)> {
    validate_request(&req)?;
    let account = state.accounts.register(&req.email, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(RegisterResponse {
            message: "registration successful, check your email to confirm the account".into(),
            user_id: account.id,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub id: Uuid,
    pub email: String,
    pub has_profile: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: AccessToken,
    pub user: LoginUser,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let outcome = state.accounts.login(&req.email, &req.password).await?;
    let account = outcome.account;

    let token = token_service::create_access_token(
        &state.jwt,
        account.id,
        &account.email,
        state.config.jwt_access_ttl,
    )?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        token,
        user: LoginUser {
            id: account.id,
            email: account.email,
            has_profile: outcome.has_profile,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmEmailQuery {
    #[serde(default)]
    pub token: String,
}

pub async fn confirm_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConfirmEmailQuery>,
) -> AppResult<Json<ApiResponse<MessageBody>>> {
    state.accounts.confirm_email(&query.token).await?;
    Ok(Json(ApiResponse::message("email confirmed, you can now log in")))
}

#[derive(Debug, Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RequestResetRequest>,
) -> AppResult<Json<ApiResponse<MessageBody>>> {
    state.accounts.request_password_reset(&req.email).await?;
    Ok(Json(ApiResponse::message(
        "if the email is registered, a password reset link has been sent",
    )))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<MessageBody>>> {
    validate_request(&req)?;
    state.accounts.reset_password(&req.token, &req.new_password).await?;
    Ok(Json(ApiResponse::message("password has been reset")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(alias = "oldPassword")]
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<MessageBody>>> {
    state
        .accounts
        .change_password(user.id, &req.current_password, &req.new_password)
        .await?;
    Ok(Json(ApiResponse::message("password changed")))
}
