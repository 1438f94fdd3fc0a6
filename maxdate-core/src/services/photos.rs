use std::sync::Arc;

use uuid::Uuid;

use maxdate_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewPhoto, Photo};
use crate::storage::PhotoStorage;
use crate::store::{PhotoStore, ProfileBundle, ProfileStore, Stores};

pub const MAX_PHOTOS: usize = 5;
pub const DEFAULT_MAX_PHOTO_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    pub bytes: Vec<u8>,
    pub original_name: String,
    pub mime_type: String,
}

fn extension_for(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

/// Up to five photos per profile with exactly one main photo.
pub struct PhotoService {
    profiles: Arc<dyn ProfileStore>,
    photos: Arc<dyn PhotoStore>,
    storage: Arc<dyn PhotoStorage>,
    max_bytes: usize,
}

impl PhotoService {
    pub fn new(stores: &Stores, storage: Arc<dyn PhotoStorage>, max_bytes: usize) -> Self {
        Self {
            profiles: stores.profiles.clone(),
            photos: stores.photos.clone(),
            storage,
            max_bytes,
        }
    }

    pub async fn upload(&self, user_id: Uuid, file: UploadedPhoto, make_main: bool) -> AppResult<Photo> {
        let bundle = self
            .profiles
            .find_profile_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileRequired, "create your profile first"))?;

        // Checked again under the store's lock.
        if bundle.photos.len() >= MAX_PHOTOS {
            return Err(AppError::new(
                ErrorCode::PhotoLimitReached,
                format!("a profile can have at most {MAX_PHOTOS} photos"),
            ));
        }

        let ext = extension_for(&file.mime_type).ok_or_else(|| {
            AppError::new(ErrorCode::UnsupportedPhoto, "unsupported image format, accepted: jpeg, png")
        })?;
        if file.bytes.is_empty() {
            return Err(AppError::new(ErrorCode::UnsupportedPhoto, "photo file is empty"));
        }
        if file.bytes.len() > self.max_bytes {
            return Err(AppError::new(
                ErrorCode::PayloadTooLarge,
                format!("photo exceeds {} bytes", self.max_bytes),
            ));
        }

        let profile_id = bundle.profile.id;
        let key = format!("profiles/{profile_id}/{}.{ext}", Uuid::now_v7());
        let size_bytes = i64::try_from(file.bytes.len()).unwrap_or(i64::MAX);

        let url = self
            .storage
            .put(&key, file.bytes, &file.mime_type)
            .await
            .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, e.to_string()))?;

        let new_photo = NewPhoto {
            profile_id,
            storage_key: key.clone(),
            url,
            original_name: file.original_name,
            mime_type: file.mime_type,
            size_bytes,
            is_main: make_main,
            sort_order: 0,
        };

        let photo = match self.photos.insert_photo(new_photo, MAX_PHOTOS).await {
            Ok(photo) => photo,
            Err(e) => {
                self.remove_object(&key).await;
                return Err(e);
            }
        };

        tracing::info!(
            profile_id = %profile_id,
            photo_id = %photo.id,
            is_main = photo.is_main,
            "photo uploaded"
        );
        Ok(photo)
    }

    pub async fn delete(&self, user_id: Uuid, photo_id: Uuid) -> AppResult<()> {
        let bundle = self.require_profile(user_id).await?;
        let removed = self
            .photos
            .delete_photo(bundle.profile.id, photo_id)
            .await?
            .ok_or_else(photo_not_found)?;

        self.remove_object(&removed.storage_key).await;
        tracing::info!(profile_id = %bundle.profile.id, photo_id = %photo_id, "photo deleted");
        Ok(())
    }

    pub async fn set_main(&self, user_id: Uuid, photo_id: Uuid) -> AppResult<Photo> {
        let bundle = self.require_profile(user_id).await?;
        let photo = self
            .photos
            .set_main_photo(bundle.profile.id, photo_id)
            .await?
            .ok_or_else(photo_not_found)?;

        tracing::info!(profile_id = %bundle.profile.id, photo_id = %photo_id, "main photo changed");
        Ok(photo)
    }

    async fn require_profile(&self, user_id: Uuid) -> AppResult<ProfileBundle> {
        self.profiles
            .find_profile_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
    }

    async fn remove_object(&self, key: &str) {
        if let Err(e) = self.storage.remove(key).await {
            tracing::warn!(key = %key, error = %e, "failed to remove photo object");
        }
    }
}

fn photo_not_found() -> AppError {
    AppError::new(ErrorCode::PhotoNotFound, "photo not found")
}
