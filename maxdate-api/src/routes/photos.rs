use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use maxdate_core::models::Photo;
use maxdate_core::services::photos::UploadedPhoto;
use maxdate_shared::errors::{AppError, AppResult, ErrorCode};
use maxdate_shared::types::api::MessageBody;
use maxdate_shared::types::auth::AuthUser;
use maxdate_shared::types::ApiResponse;

use crate::AppState;

const PHOTO_FIELD: &str = "photo";

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default, rename = "isMain")]
    pub is_main: bool,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(ErrorCode::PayloadTooLarge, "photo is too large")
    } else {
        AppError::bad_request(format!("failed to read multipart body: {e}"))
    }
}

/// Reads the `photo` field, skipping any others.
async fn read_photo(multipart: &mut Multipart) -> AppResult<UploadedPhoto> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or("photo").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(UploadedPhoto {
            bytes: bytes.to_vec(),
            original_name,
            mime_type,
        });
    }

    Err(AppError::bad_request("no photo file provided"))
}

pub async fn upload_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<Photo>>)> {
    let file = read_photo(&mut multipart).await?;
    let photo = state.photos.upload(user.id, file, query.is_main).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(photo))))
}

pub async fn delete_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(photo_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MessageBody>>> {
    state.photos.delete(user.id, photo_id).await?;
    Ok(Json(ApiResponse::message("photo deleted")))
}

pub async fn set_main_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(photo_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Photo>>> {
    let photo = state.photos.set_main(user.id, photo_id).await?;
    Ok(Json(ApiResponse::ok(photo)))
}
