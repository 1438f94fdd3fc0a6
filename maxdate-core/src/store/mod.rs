//! Persistence seams. Services only see these traits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use maxdate_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    Account, AccountChanges, Gender, Interaction, InteractionKind, Match, NewAccount, NewPhoto,
    NewProfile, Photo, Profile, ProfileChanges,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A profile together with the rows the feed and display views need.
#[derive(Debug, Clone)]
pub struct ProfileBundle {
    pub profile: Profile,
    /// Ordered by `sort_order`.
    pub photos: Vec<Photo>,
    pub email: String,
    pub is_deactivated: bool,
}

impl ProfileBundle {
    pub fn main_photo(&self) -> Option<&Photo> {
        self.photos.iter().find(|p| p.is_main).or_else(|| self.photos.first())
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with `EmailAlreadyExists` when the email is taken.
    async fn insert_account(&self, new: NewAccount) -> AppResult<Account>;
    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>>;
    async fn find_account_by_confirmation_token(&self, token: &str) -> AppResult<Option<Account>>;
    async fn find_account_by_reset_hash(&self, token_hash: &str) -> AppResult<Option<Account>>;
    /// Returns `None` when the account does not exist.
    async fn update_account(&self, id: Uuid, changes: AccountChanges) -> AppResult<Option<Account>>;
    /// Removes the account with its profile, photos, interactions and matches.
    async fn delete_account(&self, id: Uuid) -> AppResult<bool>;
    async fn account_exists(&self, id: Uuid) -> AppResult<bool>;
    /// Round trip to the backing store for health reporting.
    async fn ping(&self) -> AppResult<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fails with `ProfileAlreadyExists` when the user already has one.
    async fn insert_profile(&self, new: NewProfile) -> AppResult<Profile>;
    async fn find_profile(&self, id: Uuid) -> AppResult<Option<ProfileBundle>>;
    async fn find_profile_by_user(&self, user_id: Uuid) -> AppResult<Option<ProfileBundle>>;
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Option<Profile>>;
    /// One page of candidates admitted by `query`, newest profile first.
    async fn feed_page(&self, query: &FeedQuery) -> AppResult<Vec<ProfileBundle>>;
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn list_photos(&self, profile_id: Uuid) -> AppResult<Vec<Photo>>;
    /// Inserts the row unless the profile already holds `limit` photos
    /// (`PhotoLimitReached`). The count, main flag and order are decided while
    /// the profile is locked: the first photo is always main, a main photo
    /// demotes the others, and the new photo is ordered after the last one.
    async fn insert_photo(&self, new: NewPhoto, limit: usize) -> AppResult<Photo>;
    /// Deletes the photo if it belongs to the profile, refusing to remove the
    /// only one (`LastPhotoRequired`). When the main photo is removed, the
    /// remaining photo with the lowest order is promoted.
    async fn delete_photo(&self, profile_id: Uuid, photo_id: Uuid) -> AppResult<Option<Photo>>;
    /// Makes the photo the profile's only main photo.
    async fn set_main_photo(&self, profile_id: Uuid, photo_id: Uuid) -> AppResult<Option<Photo>>;
}

/// One row per ordered (from, to) pair.
#[async_trait]
pub trait InteractionLedger: Send + Sync {
    /// Inserts or overwrites the kind of the (from, to) row atomically.
    async fn upsert_interaction(&self, from: Uuid, to: Uuid, kind: InteractionKind) -> AppResult<Interaction>;
    async fn find_interaction(&self, from: Uuid, to: Uuid) -> AppResult<Option<Interaction>>;
    /// Every user `from` has liked or disliked.
    async fn interacted_user_ids(&self, from: Uuid) -> AppResult<Vec<Uuid>>;
}

/// One row per unordered pair.
#[async_trait]
pub trait MatchRegistry: Send + Sync {
    /// Creates the match with `initiator` as user1 unless the pair already has
    /// one. Returns the row only when this call created it.
    async fn create_match_if_absent(&self, initiator: Uuid, other: Uuid) -> AppResult<Option<Match>>;
    async fn find_match_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<Match>>;
    /// Newest first.
    async fn matches_for_user(&self, user_id: Uuid) -> AppResult<Vec<Match>>;
    /// Sets the caller's viewed flag. `false` when the match does not exist or
    /// the user is not one of its sides.
    async fn mark_viewed(&self, match_id: Uuid, user_id: Uuid) -> AppResult<bool>;
    async fn count_unviewed(&self, user_id: Uuid) -> AppResult<i64>;
}

/// Candidate filter for one feed page.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    /// Users never returned: the requester and everyone they interacted with.
    pub exclude_user_ids: Vec<Uuid>,
    pub gender: Option<Gender>,
    pub city_id: Option<i32>,
    /// Candidate `birth_date <= born_on_or_before`.
    pub born_on_or_before: Option<NaiveDate>,
    /// Candidate `birth_date > born_after`.
    pub born_after: Option<NaiveDate>,
    pub requester_gender: Gender,
    pub requester_city_id: i32,
    pub requester_age: i32,
    pub offset: i64,
    pub limit: i64,
}

impl FeedQuery {
    /// In-memory evaluation of the same predicate `PgStore` runs in SQL.
    pub fn admits(&self, candidate: &ProfileBundle) -> bool {
        let p = &candidate.profile;

        if self.exclude_user_ids.contains(&p.user_id)
            || !p.is_visible
            || candidate.is_deactivated
            || candidate.photos.is_empty()
        {
            return false;
        }

        if self.gender.is_some_and(|g| p.gender != g)
            || self.city_id.is_some_and(|c| p.city_id != c)
            || self.born_on_or_before.is_some_and(|d| p.birth_date > d)
            || self.born_after.is_some_and(|d| p.birth_date <= d)
        {
            return false;
        }

        p.preferred_gender.map_or(true, |g| g == self.requester_gender)
            && p.preferred_city_id.map_or(true, |c| c == self.requester_city_id)
            && p.preferred_age_min.map_or(true, |min| min <= self.requester_age)
            && p.preferred_age_max.map_or(true, |max| max >= self.requester_age)
    }
}

pub(crate) fn photo_limit_reached(limit: usize) -> AppError {
    AppError::new(ErrorCode::PhotoLimitReached, format!("a profile can have at most {limit} photos"))
}

pub(crate) fn last_photo_required() -> AppError {
    AppError::new(ErrorCode::LastPhotoRequired, "a profile must keep at least one photo")
}

/// The store handles every service is built from.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub photos: Arc<dyn PhotoStore>,
    pub interactions: Arc<dyn InteractionLedger>,
    pub matches: Arc<dyn MatchRegistry>,
}

impl Stores {
    /// All seams served by one backend.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: AccountStore + ProfileStore + PhotoStore + InteractionLedger + MatchRegistry + 'static,
    {
        Self {
            accounts: backend.clone(),
            profiles: backend.clone(),
            photos: backend.clone(),
            interactions: backend.clone(),
            matches: backend,
        }
    }

    pub fn memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }
}
