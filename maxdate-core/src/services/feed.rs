use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use maxdate_shared::errors::{AppError, AppResult, ErrorCode};
use maxdate_shared::types::PaginationParams;

use crate::age;
use crate::cities::{CityDirectory, CityRef};
use crate::models::{sort_for_display, Gender, Photo, Profile};
use crate::store::{FeedQuery, InteractionLedger, ProfileBundle, ProfileStore, Stores};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCandidate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub gender: Gender,
    pub city: Option<CityRef>,
    pub bio: Option<String>,
    pub vk_link: Option<String>,
    pub max_link: Option<String>,
    /// Main photo first, then by order.
    pub photos: Vec<Photo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Builds the candidate filter for `requester` as of `today`.
///
/// The requester's own preferences restrict the candidate; each candidate's
/// preferences must in turn accept the requester.
pub fn feed_query(
    requester: &Profile,
    interacted: Vec<Uuid>,
    today: NaiveDate,
    page: &PaginationParams,
) -> FeedQuery {
    let mut exclude_user_ids = interacted;
    exclude_user_ids.push(requester.user_id);

    FeedQuery {
        exclude_user_ids,
        gender: requester.preferred_gender,
        city_id: requester.preferred_city_id,
        born_on_or_before: requester
            .preferred_age_min
            .map(|min| age::latest_birth_date_for_min_age(today, min)),
        born_after: requester
            .preferred_age_max
            .map(|max| age::birth_date_exclusive_bound_for_max_age(today, max)),
        requester_gender: requester.gender,
        requester_city_id: requester.city_id,
        requester_age: age::age_on(requester.birth_date, today),
        offset: i64::try_from(page.offset()).unwrap_or(i64::MAX),
        limit: i64::try_from(page.limit).unwrap_or(i64::MAX),
    }
}

/// Read-only discovery feed.
pub struct FeedSelector {
    profiles: Arc<dyn ProfileStore>,
    interactions: Arc<dyn InteractionLedger>,
    cities: Arc<CityDirectory>,
}

impl FeedSelector {
    pub fn new(stores: &Stores, cities: Arc<CityDirectory>) -> Self {
        Self {
            profiles: stores.profiles.clone(),
            interactions: stores.interactions.clone(),
            cities,
        }
    }

    pub async fn get_feed(&self, requester_id: Uuid, page: u64, page_size: u64) -> AppResult<Vec<FeedCandidate>> {
        let params = PaginationParams::new(page, page_size);
        params.validate()?;

        let requester = self
            .profiles
            .find_profile_by_user(requester_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProfileRequired, "create your profile first"))?;
        if requester.photos.is_empty() {
            return Err(AppError::new(ErrorCode::PhotoRequired, "add at least one photo first"));
        }

        let interacted = self.interactions.interacted_user_ids(requester_id).await?;
        let query = feed_query(&requester.profile, interacted, age::today(), &params);
        let candidates = self.profiles.feed_page(&query).await?;

        tracing::debug!(
            user_id = %requester_id,
            page,
            page_size,
            returned = candidates.len(),
            "feed served"
        );

        let today = age::today();
        Ok(candidates
            .into_iter()
            .map(|bundle| self.candidate(bundle, today))
            .collect())
    }

    fn candidate(&self, bundle: ProfileBundle, today: NaiveDate) -> FeedCandidate {
        let ProfileBundle { profile, mut photos, email, .. } = bundle;
        sort_for_display(&mut photos);

        FeedCandidate {
            id: profile.id,
            user_id: profile.user_id,
            age: age::age_on(profile.birth_date, today),
            city: self.cities.city_ref(profile.city_id),
            email: (!profile.hide_email).then_some(email),
            first_name: profile.first_name,
            last_name: profile.last_name,
            gender: profile.gender,
            bio: profile.bio,
            vk_link: profile.vk_link,
            max_link: profile.max_link,
            photos,
        }
    }
}
