use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use maxdate_shared::errors::{AppError, AppResult, ErrorCode};

use crate::age;
use crate::cities::{CityDirectory, CityRef};
use crate::models::Photo;
use crate::store::{MatchRegistry, ProfileStore, Stores};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub city: Option<CityRef>,
    pub max_link: Option<String>,
    pub vk_link: Option<String>,
    pub main_photo: Option<Photo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub match_id: Uuid,
    pub is_new: bool,
    pub created_at: DateTime<Utc>,
    pub profile: MatchedProfile,
}

/// Read side of the match registry plus per-side viewed flags.
pub struct MatchService {
    matches: Arc<dyn MatchRegistry>,
    profiles: Arc<dyn ProfileStore>,
    cities: Arc<CityDirectory>,
}

impl MatchService {
    pub fn new(stores: &Stores, cities: Arc<CityDirectory>) -> Self {
        Self {
            matches: stores.matches.clone(),
            profiles: stores.profiles.clone(),
            cities,
        }
    }

    /// Newest first. Matches whose counterpart has no profile are skipped.
    pub async fn get_matches(&self, user_id: Uuid) -> AppResult<Vec<MatchSummary>> {
        let matches = self.matches.matches_for_user(user_id).await?;
        let mut summaries = Vec::with_capacity(matches.len());

        for m in matches {
            let Some(bundle) = self.profiles.find_profile_by_user(m.counterpart_of(user_id)).await? else {
                continue;
            };
            let main_photo = bundle.main_photo().cloned();
            let profile = bundle.profile;

            summaries.push(MatchSummary {
                match_id: m.id,
                is_new: !m.viewed_by(user_id),
                created_at: m.created_at,
                profile: MatchedProfile {
                    id: profile.id,
                    user_id: profile.user_id,
                    age: age::calculate_age(profile.birth_date),
                    city: self.cities.city_ref(profile.city_id),
                    first_name: profile.first_name,
                    last_name: profile.last_name,
                    max_link: profile.max_link,
                    vk_link: profile.vk_link,
                    main_photo,
                },
            });
        }

        tracing::debug!(user_id = %user_id, count = summaries.len(), "matches listed");
        Ok(summaries)
    }

    /// Sets only the caller's flag. Repeating it is a no-op.
    pub async fn mark_match_as_viewed(&self, user_id: Uuid, match_id: Uuid) -> AppResult<()> {
        if !self.matches.mark_viewed(match_id, user_id).await? {
            return Err(AppError::new(ErrorCode::MatchNotFound, "match not found"));
        }
        tracing::debug!(user_id = %user_id, match_id = %match_id, "match viewed");
        Ok(())
    }

    pub async fn get_unviewed_match_count(&self, user_id: Uuid) -> AppResult<i64> {
        self.matches.count_unviewed(user_id).await
    }
}
