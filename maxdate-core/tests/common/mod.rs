#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use maxdate_core::age;
use maxdate_core::mailer::{MailError, Mailer};
use maxdate_core::models::{AccountChanges, Gender, NewAccount, NewProfile, Profile, ProfileChanges};
use maxdate_core::services::photos::{UploadedPhoto, DEFAULT_MAX_PHOTO_BYTES};
use maxdate_core::services::profiles::CreateProfile;
use maxdate_core::services::{
    AccountService, FeedSelector, MatchService, MatchingEngine, PhotoService, ProfileService,
};
use maxdate_core::store::{FeedQuery, ProfileBundle, ProfileStore};
use maxdate_core::{CityDirectory, MemoryPhotoStorage, Stores};
use maxdate_shared::errors::AppResult;

pub const MOSCOW: i32 = 1;
pub const SPB: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMail {
    Confirmation { to: String, token: String },
    PasswordReset { to: String, token: String },
    Match { to: String, name: String },
}

/// Captures outgoing mail; match notifications can be made to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail_matches: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn match_mails(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SentMail::Match { to, name } => Some((to, name)),
                _ => None,
            })
            .collect()
    }

    pub fn last_confirmation_token(&self) -> Option<String> {
        self.sent().into_iter().rev().find_map(|m| match m {
            SentMail::Confirmation { token, .. } => Some(token),
            _ => None,
        })
    }

    pub fn last_reset_token(&self) -> Option<String> {
        self.sent().into_iter().rev().find_map(|m| match m {
            SentMail::PasswordReset { token, .. } => Some(token),
            _ => None,
        })
    }

    pub fn fail_match_notifications(&self, fail: bool) {
        self.fail_matches.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_confirmation(&self, to: &str, token: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentMail::Confirmation { to: to.into(), token: token.into() });
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, token: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentMail::PasswordReset { to: to.into(), token: token.into() });
        Ok(())
    }

    async fn send_match_notification(&self, to: &str, match_name: &str) -> Result<(), MailError> {
        if self.fail_matches.load(Ordering::SeqCst) {
            return Err(MailError("smtp unavailable".into()));
        }
        self.sent.lock().unwrap().push(SentMail::Match { to: to.into(), name: match_name.into() });
        Ok(())
    }
}

/// Every service wired over one in-memory store.
pub struct Harness {
    pub stores: Stores,
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<MemoryPhotoStorage>,
    pub accounts: AccountService,
    pub profiles: ProfileService,
    pub photos: PhotoService,
    pub feed: FeedSelector,
    pub engine: MatchingEngine,
    pub matches: MatchService,
}

impl Harness {
    pub fn new() -> Self {
        let stores = Stores::memory();
        let mailer = Arc::new(RecordingMailer::default());
        let storage = Arc::new(MemoryPhotoStorage::new("http://photos.test"));
        let cities = Arc::new(CityDirectory::embedded().expect("embedded cities"));

        Self {
            accounts: AccountService::new(&stores, mailer.clone(), storage.clone()),
            profiles: ProfileService::new(&stores, cities.clone()),
            photos: PhotoService::new(&stores, storage.clone(), DEFAULT_MAX_PHOTO_BYTES),
            feed: FeedSelector::new(&stores, cities.clone()),
            engine: MatchingEngine::new(&stores, mailer.clone()),
            matches: MatchService::new(&stores, cities),
            stores,
            mailer,
            storage,
        }
    }

    /// A confirmed account inserted directly, skipping password hashing.
    pub async fn account(&self, email: &str) -> Uuid {
        let account = self
            .stores
            .accounts
            .insert_account(NewAccount {
                email: email.into(),
                password_hash: "not-a-real-hash".into(),
                confirmation_token: None,
            })
            .await
            .unwrap();
        self.stores
            .accounts
            .update_account(account.id, AccountChanges { email_confirmed: Some(true), ..Default::default() })
            .await
            .unwrap();
        account.id
    }

    pub async fn profile(&self, user_id: Uuid, first_name: &str, gender: Gender, birth_date: NaiveDate) -> Uuid {
        self.profiles
            .create(user_id, profile_input(first_name, gender, birth_date, MOSCOW))
            .await
            .unwrap()
            .id
    }

    /// Account, profile and one photo: eligible for the feed and for liking.
    pub async fn member(&self, first_name: &str, gender: Gender, age_years: i32) -> Uuid {
        let user_id = self.account(&format!("{}-{}@test.ru", first_name.to_lowercase(), Uuid::new_v4().simple())).await;
        self.profile(user_id, first_name, gender, born_years_ago(age_years)).await;
        self.upload(user_id).await;
        user_id
    }

    pub async fn upload(&self, user_id: Uuid) -> Uuid {
        self.photos.upload(user_id, png(), false).await.unwrap().id
    }

    pub async fn update(&self, user_id: Uuid, changes: ProfileChanges) {
        self.profiles.update(user_id, changes).await.unwrap();
    }
}

pub fn profile_input(first_name: &str, gender: Gender, birth_date: NaiveDate, city_id: i32) -> CreateProfile {
    CreateProfile {
        first_name: first_name.into(),
        last_name: "Тестова".into(),
        middle_name: None,
        birth_date,
        gender,
        city_id,
        vk_link: None,
        max_link: None,
        bio: None,
    }
}

/// Birth date of someone who turns `years` today.
pub fn born_years_ago(years: i32) -> NaiveDate {
    age::years_before(age::today(), years)
}

pub fn png() -> UploadedPhoto {
    UploadedPhoto {
        bytes: vec![0x89, b'P', b'N', b'G', 1, 2, 3],
        original_name: "photo.png".into(),
        mime_type: "image/png".into(),
    }
}

/// Profile reads that take a while, like a database round trip, so
/// concurrent callers overlap between their read and their write.
pub struct SlowProfiles(pub Arc<dyn ProfileStore>);

impl SlowProfiles {
    /// `stores` with slow profile reads; every other seam is shared.
    pub fn wrap(stores: &Stores) -> Stores {
        Stores {
            profiles: Arc::new(SlowProfiles(stores.profiles.clone())),
            ..stores.clone()
        }
    }
}

#[async_trait]
impl ProfileStore for SlowProfiles {
    async fn insert_profile(&self, new: NewProfile) -> AppResult<Profile> {
        self.0.insert_profile(new).await
    }

    async fn find_profile(&self, id: Uuid) -> AppResult<Option<ProfileBundle>> {
        self.0.find_profile(id).await
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> AppResult<Option<ProfileBundle>> {
        let found = self.0.find_profile_by_user(user_id).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        found
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Option<Profile>> {
        self.0.update_profile(id, changes).await
    }

    async fn feed_page(&self, query: &FeedQuery) -> AppResult<Vec<ProfileBundle>> {
        self.0.feed_page(query).await
    }
}
