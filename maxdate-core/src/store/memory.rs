use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use maxdate_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    Account, AccountChanges, Interaction, InteractionKind, Match, NewAccount, NewPhoto, NewProfile,
    Photo, Profile, ProfileChanges,
};

use super::{
    last_photo_required, photo_limit_reached, AccountStore, FeedQuery, InteractionLedger,
    MatchRegistry, PhotoStore, ProfileBundle, ProfileStore,
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    profiles: HashMap<Uuid, Profile>,
    photos: HashMap<Uuid, Photo>,
    interactions: HashMap<(Uuid, Uuid), Interaction>,
    matches: Vec<Match>,
}

impl Tables {
    fn photos_of(&self, profile_id: Uuid) -> Vec<Photo> {
        let mut photos: Vec<Photo> = self
            .photos
            .values()
            .filter(|p| p.profile_id == profile_id)
            .cloned()
            .collect();
        photos.sort_by_key(|p| (p.sort_order, p.created_at));
        photos
    }

    fn bundle(&self, profile: &Profile) -> Option<ProfileBundle> {
        let account = self.accounts.get(&profile.user_id)?;
        Some(ProfileBundle {
            profile: profile.clone(),
            photos: self.photos_of(profile.id),
            email: account.email.clone(),
            is_deactivated: account.is_deactivated,
        })
    }
}

/// In-process backend for tests and local runs. A single lock over all
/// tables makes every operation atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, new: NewAccount) -> AppResult<Account> {
        let mut tables = self.tables.write().await;
        let email = new.email.to_lowercase();
        if tables.accounts.values().any(|a| a.email == email) {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email is already registered"));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email,
            password_hash: new.password_hash,
            email_confirmed: false,
            confirmation_token: new.confirmation_token,
            reset_token_hash: None,
            reset_expires_at: None,
            is_active: true,
            is_deactivated: false,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let email = email.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_account_by_confirmation_token(&self, token: &str) -> AppResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.confirmation_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_account_by_reset_hash(&self, token_hash: &str) -> AppResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.reset_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn update_account(&self, id: Uuid, changes: AccountChanges) -> AppResult<Option<Account>> {
        let mut tables = self.tables.write().await;
        Ok(tables.accounts.get_mut(&id).map(|account| {
            changes.apply(account);
            account.clone()
        }))
    }

    async fn delete_account(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.accounts.remove(&id).is_none() {
            return Ok(false);
        }

        let profile_ids: Vec<Uuid> = tables
            .profiles
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        for profile_id in &profile_ids {
            tables.profiles.remove(profile_id);
        }
        tables.photos.retain(|_, p| !profile_ids.contains(&p.profile_id));
        tables.interactions.retain(|(from, to), _| *from != id && *to != id);
        tables.matches.retain(|m| !m.involves(id));
        Ok(true)
    }

    async fn account_exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables.read().await.accounts.contains_key(&id))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn insert_profile(&self, new: NewProfile) -> AppResult<Profile> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&new.user_id) {
            return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
        }
        if tables.profiles.values().any(|p| p.user_id == new.user_id) {
            return Err(AppError::new(ErrorCode::ProfileAlreadyExists, "profile already exists"));
        }

        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            first_name: new.first_name,
            last_name: new.last_name,
            middle_name: new.middle_name,
            birth_date: new.birth_date,
            gender: new.gender,
            city_id: new.city_id,
            vk_link: new.vk_link,
            max_link: new.max_link,
            bio: new.bio,
            hide_email: false,
            is_visible: true,
            preferred_gender: None,
            preferred_age_min: None,
            preferred_age_max: None,
            preferred_city_id: None,
            created_at: now,
            updated_at: now,
        };
        tables.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn find_profile(&self, id: Uuid) -> AppResult<Option<ProfileBundle>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(&id).and_then(|p| tables.bundle(p)))
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> AppResult<Option<ProfileBundle>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .find(|p| p.user_id == user_id)
            .and_then(|p| tables.bundle(p)))
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Option<Profile>> {
        let mut tables = self.tables.write().await;
        Ok(tables.profiles.get_mut(&id).map(|profile| {
            changes.apply(profile);
            profile.clone()
        }))
    }

    async fn feed_page(&self, query: &FeedQuery) -> AppResult<Vec<ProfileBundle>> {
        let tables = self.tables.read().await;
        let mut admitted: Vec<ProfileBundle> = tables
            .profiles
            .values()
            .filter_map(|p| tables.bundle(p))
            .filter(|b| query.admits(b))
            .collect();

        admitted.sort_by(|a, b| {
            b.profile
                .created_at
                .cmp(&a.profile.created_at)
                .then(b.profile.id.cmp(&a.profile.id))
        });

        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        Ok(admitted.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn list_photos(&self, profile_id: Uuid) -> AppResult<Vec<Photo>> {
        Ok(self.tables.read().await.photos_of(profile_id))
    }

    async fn insert_photo(&self, new: NewPhoto, limit: usize) -> AppResult<Photo> {
        let mut tables = self.tables.write().await;
        if !tables.profiles.contains_key(&new.profile_id) {
            return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
        }

        let existing = tables.photos_of(new.profile_id);
        if existing.len() >= limit {
            return Err(photo_limit_reached(limit));
        }
        let is_main = new.is_main || existing.is_empty();
        let sort_order = existing.iter().map(|p| p.sort_order + 1).max().unwrap_or(0);

        if is_main {
            for photo in tables.photos.values_mut().filter(|p| p.profile_id == new.profile_id) {
                photo.is_main = false;
            }
        }

        let photo = Photo {
            id: Uuid::new_v4(),
            profile_id: new.profile_id,
            storage_key: new.storage_key,
            url: new.url,
            original_name: new.original_name,
            mime_type: new.mime_type,
            size_bytes: new.size_bytes,
            is_main,
            sort_order,
            created_at: Utc::now(),
        };
        tables.photos.insert(photo.id, photo.clone());
        Ok(photo)
    }

    async fn delete_photo(&self, profile_id: Uuid, photo_id: Uuid) -> AppResult<Option<Photo>> {
        let mut tables = self.tables.write().await;
        let owned = tables.photos.get(&photo_id).is_some_and(|p| p.profile_id == profile_id);
        if !owned {
            return Ok(None);
        }
        if tables.photos_of(profile_id).len() <= 1 {
            return Err(last_photo_required());
        }
        let Some(removed) = tables.photos.remove(&photo_id) else {
            return Ok(None);
        };

        if removed.is_main {
            let next_id = tables.photos_of(profile_id).first().map(|p| p.id);
            if let Some(photo) = next_id.and_then(|id| tables.photos.get_mut(&id)) {
                photo.is_main = true;
            }
        }

        Ok(Some(removed))
    }

    async fn set_main_photo(&self, profile_id: Uuid, photo_id: Uuid) -> AppResult<Option<Photo>> {
        let mut tables = self.tables.write().await;
        let owned = tables.photos.get(&photo_id).is_some_and(|p| p.profile_id == profile_id);
        if !owned {
            return Ok(None);
        }

        for photo in tables.photos.values_mut().filter(|p| p.profile_id == profile_id) {
            photo.is_main = photo.id == photo_id;
        }
        Ok(tables.photos.get(&photo_id).cloned())
    }
}

#[async_trait]
impl InteractionLedger for MemoryStore {
    async fn upsert_interaction(&self, from: Uuid, to: Uuid, kind: InteractionKind) -> AppResult<Interaction> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let interaction = tables
            .interactions
            .entry((from, to))
            .and_modify(|i| {
                i.kind = kind;
                i.updated_at = now;
            })
            .or_insert_with(|| Interaction {
                id: Uuid::new_v4(),
                from_user_id: from,
                to_user_id: to,
                kind,
                created_at: now,
                updated_at: now,
            });
        Ok(interaction.clone())
    }

    async fn find_interaction(&self, from: Uuid, to: Uuid) -> AppResult<Option<Interaction>> {
        Ok(self.tables.read().await.interactions.get(&(from, to)).cloned())
    }

    async fn interacted_user_ids(&self, from: Uuid) -> AppResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        Ok(tables
            .interactions
            .keys()
            .filter(|(f, _)| *f == from)
            .map(|(_, to)| *to)
            .collect())
    }
}

#[async_trait]
impl MatchRegistry for MemoryStore {
    async fn create_match_if_absent(&self, initiator: Uuid, other: Uuid) -> AppResult<Option<Match>> {
        let mut tables = self.tables.write().await;
        if tables.matches.iter().any(|m| m.pairs(initiator, other)) {
            return Ok(None);
        }

        let created = Match {
            id: Uuid::new_v4(),
            user1_id: initiator,
            user2_id: other,
            user1_viewed: false,
            user2_viewed: false,
            created_at: Utc::now(),
        };
        tables.matches.push(created.clone());
        Ok(Some(created))
    }

    async fn find_match_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<Match>> {
        let tables = self.tables.read().await;
        Ok(tables.matches.iter().find(|m| m.pairs(a, b)).cloned())
    }

    async fn matches_for_user(&self, user_id: Uuid) -> AppResult<Vec<Match>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Match> = tables
            .matches
            .iter()
            .filter(|m| m.involves(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn mark_viewed(&self, match_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(m) = tables.matches.iter_mut().find(|m| m.id == match_id) else {
            return Ok(false);
        };

        if m.user1_id == user_id {
            m.user1_viewed = true;
        } else if m.user2_id == user_id {
            m.user2_viewed = true;
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    async fn count_unviewed(&self, user_id: Uuid) -> AppResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .matches
            .iter()
            .filter(|m| m.involves(user_id) && !m.viewed_by(user_id))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}
