use std::sync::{Arc, LazyLock};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use maxdate_core::models::{Gender, ProfileChanges};
use maxdate_core::services::profiles::{CreateProfile, DisplayProfile, ProfileView};
use maxdate_shared::errors::{AppError, AppResult, ErrorCode};
use maxdate_shared::types::auth::AuthUser;
use maxdate_shared::types::ApiResponse;

use crate::routes::validate_request;
use crate::AppState;

static VK_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@[A-Za-z0-9_]+$").expect("vk link pattern compiles"));
static MAX_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://max\.me/[A-Za-z0-9_]+$").expect("max link pattern compiles"));

const NAME_MAX: usize = 100;
const VK_LINK_MAX: usize = 100;
const MAX_LINK_MAX: usize = 255;
const BIO_MAX: usize = 2000;

fn validate_vk_link(value: &str) -> Result<(), ValidationError> {
    if VK_LINK.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("vk_link_format"))
    }
}

fn validate_max_link(value: &str) -> Result<(), ValidationError> {
    if MAX_LINK.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("max_link_format"))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(max = 100))]
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub city_id: i32,
    #[validate(length(max = 100), custom = "validate_vk_link")]
    pub vk_link: Option<String>,
    #[validate(length(max = 255), custom = "validate_max_link")]
    pub max_link: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

impl From<CreateProfileRequest> for CreateProfile {
    fn from(req: CreateProfileRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            middle_name: req.middle_name,
            birth_date: req.birth_date,
            gender: req.gender,
            city_id: req.city_id,
            vk_link: req.vk_link,
            max_link: req.max_link,
            bio: req.bio,
        }
    }
}

/// Distinguishes an explicit `null` (clear) from an absent field (keep).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub middle_name: Option<Option<String>>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub city_id: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub vk_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    pub hide_email: Option<bool>,
    pub is_visible: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub preferred_gender: Option<Option<Gender>>,
    #[serde(default, deserialize_with = "double_option")]
    pub preferred_age_min: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub preferred_age_max: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub preferred_city_id: Option<Option<i32>>,
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("{field} must be between {min} and {max} characters"),
        ));
    }
    Ok(())
}

fn check_format(field: &str, value: &str, rule: fn(&str) -> Result<(), ValidationError>) -> AppResult<()> {
    rule(value).map_err(|_| AppError::new(ErrorCode::ValidationError, format!("{field} has an invalid format")))
}

impl UpdateProfileRequest {
    fn into_changes(self) -> AppResult<ProfileChanges> {
        if let Some(v) = &self.first_name {
            check_length("firstName", v, 1, NAME_MAX)?;
        }
        if let Some(v) = &self.last_name {
            check_length("lastName", v, 1, NAME_MAX)?;
        }
        if let Some(Some(v)) = &self.middle_name {
            check_length("middleName", v, 0, NAME_MAX)?;
        }
        if let Some(Some(v)) = &self.vk_link {
            check_length("vkLink", v, 0, VK_LINK_MAX)?;
            check_format("vkLink", v, validate_vk_link)?;
        }
        if let Some(Some(v)) = &self.max_link {
            check_length("maxLink", v, 0, MAX_LINK_MAX)?;
            check_format("maxLink", v, validate_max_link)?;
        }
        if let Some(Some(v)) = &self.bio {
            check_length("bio", v, 0, BIO_MAX)?;
        }

        Ok(ProfileChanges {
            first_name: self.first_name,
            last_name: self.last_name,
            middle_name: self.middle_name,
            birth_date: self.birth_date,
            gender: self.gender,
            city_id: self.city_id,
            vk_link: self.vk_link,
            max_link: self.max_link,
            bio: self.bio,
            hide_email: self.hide_email,
            is_visible: self.is_visible,
            preferred_gender: self.preferred_gender,
            preferred_age_min: self.preferred_age_min,
            preferred_age_max: self.preferred_age_max,
            preferred_city_id: self.preferred_city_id,
            ..Default::default()
        })
    }
}

pub async fn create_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProfileRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProfileView>>)> {
    validate_request(&req)?;
    let profile = state.profiles.create(user.id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(profile))))
}

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = state.profiles.update(user.id, req.into_changes()?).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

pub async fn get_own_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = state.profiles.get_own(user.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

pub async fn get_profile(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DisplayProfile>>> {
    let profile = state.profiles.get_display(profile_id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}
