use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use maxdate_shared::errors::{AppError, AppResult, ErrorCode};

use crate::age::{self, MAX_PREFERRED_AGE, MIN_AGE};
use crate::cities::{CityDirectory, CityRef};
use crate::models::{sort_for_display, Gender, NewProfile, Photo, Profile, ProfileChanges};
use crate::store::{AccountStore, ProfileBundle, ProfileStore, Stores};

#[derive(Debug, Clone)]
pub struct CreateProfile {
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub city_id: i32,
    pub vk_link: Option<String>,
    pub max_link: Option<String>,
    pub bio: Option<String>,
}

/// The owner's view of their profile, preferences included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub gender: Gender,
    pub city: Option<CityRef>,
    pub vk_link: Option<String>,
    pub max_link: Option<String>,
    pub bio: Option<String>,
    pub hide_email: bool,
    pub is_visible: bool,
    pub preferred_gender: Option<Gender>,
    pub preferred_age_min: Option<i32>,
    pub preferred_age_max: Option<i32>,
    pub preferred_city_id: Option<i32>,
    pub photos: Vec<Photo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Another user's profile as shown to a viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub gender: Gender,
    pub city: Option<CityRef>,
    pub vk_link: Option<String>,
    pub max_link: Option<String>,
    pub bio: Option<String>,
    pub photos: Vec<Photo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub struct ProfileService {
    accounts: Arc<dyn AccountStore>,
    profiles: Arc<dyn ProfileStore>,
    cities: Arc<CityDirectory>,
}

impl ProfileService {
    pub fn new(stores: &Stores, cities: Arc<CityDirectory>) -> Self {
        Self {
            accounts: stores.accounts.clone(),
            profiles: stores.profiles.clone(),
            cities,
        }
    }

    pub async fn create(&self, user_id: Uuid, input: CreateProfile) -> AppResult<ProfileView> {
        if !self.accounts.account_exists(user_id).await? {
            return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
        }
        if self.profiles.find_profile_by_user(user_id).await?.is_some() {
            return Err(AppError::new(ErrorCode::ProfileAlreadyExists, "profile already exists"));
        }

        ensure_adult(input.birth_date)?;
        self.ensure_city(input.city_id)?;

        let profile = self
            .profiles
            .insert_profile(NewProfile {
                user_id,
                first_name: input.first_name,
                last_name: input.last_name,
                middle_name: input.middle_name,
                birth_date: input.birth_date,
                gender: input.gender,
                city_id: input.city_id,
                vk_link: input.vk_link,
                max_link: input.max_link,
                bio: input.bio,
            })
            .await?;

        tracing::info!(user_id = %user_id, profile_id = %profile.id, "profile created");
        Ok(self.profile_view(profile, Vec::new()))
    }

    /// Partial update. Invariants are checked against the merged state.
    pub async fn update(&self, user_id: Uuid, changes: ProfileChanges) -> AppResult<ProfileView> {
        let bundle = self.require_own(user_id).await?;

        if let Some(birth_date) = changes.birth_date {
            ensure_adult(birth_date)?;
        }
        if let Some(city_id) = changes.city_id {
            self.ensure_city(city_id)?;
        }
        if let Some(Some(city_id)) = changes.preferred_city_id {
            self.ensure_city(city_id)?;
        }

        let merged = changes.merged_into(&bundle.profile);
        ensure_age_range(merged.preferred_age_min, merged.preferred_age_max)?;

        let profile = self
            .profiles
            .update_profile(bundle.profile.id, changes)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

        tracing::info!(user_id = %user_id, profile_id = %profile.id, "profile updated");
        Ok(self.profile_view(profile, bundle.photos))
    }

    pub async fn get_own(&self, user_id: Uuid) -> AppResult<ProfileView> {
        let bundle = self.require_own(user_id).await?;
        Ok(self.profile_view(bundle.profile, bundle.photos))
    }

    /// Invisible profiles are reported as missing.
    pub async fn get_display(&self, profile_id: Uuid) -> AppResult<DisplayProfile> {
        let bundle = self
            .profiles
            .find_profile(profile_id)
            .await?
            .filter(|b| b.profile.is_visible)
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

        let ProfileBundle { profile, mut photos, email, .. } = bundle;
        sort_for_display(&mut photos);

        Ok(DisplayProfile {
            id: profile.id,
            user_id: profile.user_id,
            age: age::calculate_age(profile.birth_date),
            city: self.cities.city_ref(profile.city_id),
            email: (!profile.hide_email).then_some(email),
            first_name: profile.first_name,
            last_name: profile.last_name,
            middle_name: profile.middle_name,
            birth_date: profile.birth_date,
            gender: profile.gender,
            vk_link: profile.vk_link,
            max_link: profile.max_link,
            bio: profile.bio,
            photos,
        })
    }

    async fn require_own(&self, user_id: Uuid) -> AppResult<ProfileBundle> {
        self.profiles
            .find_profile_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
    }

    fn ensure_city(&self, city_id: i32) -> AppResult<()> {
        if self.cities.contains(city_id) {
            Ok(())
        } else {
            Err(AppError::new(ErrorCode::CityNotFound, format!("city {city_id} does not exist")))
        }
    }

    fn profile_view(&self, profile: Profile, mut photos: Vec<Photo>) -> ProfileView {
        sort_for_display(&mut photos);
        ProfileView {
            id: profile.id,
            user_id: profile.user_id,
            age: age::calculate_age(profile.birth_date),
            city: self.cities.city_ref(profile.city_id),
            first_name: profile.first_name,
            last_name: profile.last_name,
            middle_name: profile.middle_name,
            birth_date: profile.birth_date,
            gender: profile.gender,
            vk_link: profile.vk_link,
            max_link: profile.max_link,
            bio: profile.bio,
            hide_email: profile.hide_email,
            is_visible: profile.is_visible,
            preferred_gender: profile.preferred_gender,
            preferred_age_min: profile.preferred_age_min,
            preferred_age_max: profile.preferred_age_max,
            preferred_city_id: profile.preferred_city_id,
            photos,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

fn ensure_adult(birth_date: NaiveDate) -> AppResult<()> {
    if age::calculate_age(birth_date) < MIN_AGE {
        return Err(AppError::new(ErrorCode::Underage, format!("you must be at least {MIN_AGE} years old")));
    }
    Ok(())
}

fn ensure_age_range(min: Option<i32>, max: Option<i32>) -> AppResult<()> {
    let in_bounds = |v: i32| (MIN_AGE..=MAX_PREFERRED_AGE).contains(&v);
    if min.is_some_and(|v| !in_bounds(v)) || max.is_some_and(|v| !in_bounds(v)) {
        return Err(AppError::new(
            ErrorCode::InvalidAgeRange,
            format!("preferred ages must be between {MIN_AGE} and {MAX_PREFERRED_AGE}"),
        ));
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(AppError::new(ErrorCode::InvalidAgeRange, "minimum age cannot exceed maximum age"));
        }
    }
    Ok(())
}
