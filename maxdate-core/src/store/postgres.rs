use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use maxdate_shared::clients::db::DbPool;
use maxdate_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    Account, AccountChanges, Interaction, InteractionKind, Match, NewAccount, NewInteraction,
    NewMatch, NewPhoto, NewProfile, Photo, Profile, ProfileChanges,
};
use crate::schema::{accounts, interactions, matches, photos, profiles};

use super::{
    last_photo_required, photo_limit_reached, AccountStore, FeedQuery, InteractionLedger,
    MatchRegistry, PhotoStore, ProfileBundle, ProfileStore,
};

type BundleRow = (Profile, String, bool);

/// PostgreSQL backend. Diesel calls run on the blocking pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut PgConnection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| AppError::internal(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("database task failed: {e}")))?
    }
}

fn is_foreign_key_violation(err: &DieselError) -> bool {
    matches!(err, DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _))
}

/// Serializes photo writes of one profile until the transaction ends.
fn lock_profile(conn: &mut PgConnection, profile_id: Uuid) -> AppResult<()> {
    profiles::table
        .find(profile_id)
        .select(profiles::id)
        .for_update()
        .first::<Uuid>(conn)
        .optional()?
        .map(|_| ())
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

/// Attaches photos to profile rows with one extra query.
fn attach_photos(conn: &mut PgConnection, rows: Vec<BundleRow>) -> QueryResult<Vec<ProfileBundle>> {
    let ids: Vec<Uuid> = rows.iter().map(|(p, _, _)| p.id).collect();
    let all_photos: Vec<Photo> = photos::table
        .filter(photos::profile_id.eq_any(&ids))
        .order((photos::profile_id, photos::sort_order.asc(), photos::created_at.asc()))
        .load(conn)?;

    let mut by_profile: HashMap<Uuid, Vec<Photo>> = HashMap::new();
    for photo in all_photos {
        by_profile.entry(photo.profile_id).or_default().push(photo);
    }

    Ok(rows
        .into_iter()
        .map(|(profile, email, is_deactivated)| ProfileBundle {
            photos: by_profile.remove(&profile.id).unwrap_or_default(),
            profile,
            email,
            is_deactivated,
        })
        .collect())
}

enum BundleKey {
    Profile(Uuid),
    User(Uuid),
}

fn find_bundle(conn: &mut PgConnection, key: BundleKey) -> AppResult<Option<ProfileBundle>> {
    let sql = profiles::table
        .inner_join(accounts::table)
        .select((profiles::all_columns, accounts::email, accounts::is_deactivated))
        .into_boxed();
    let sql = match key {
        BundleKey::Profile(id) => sql.filter(profiles::id.eq(id)),
        BundleKey::User(user_id) => sql.filter(profiles::user_id.eq(user_id)),
    };

    match sql.first::<BundleRow>(conn).optional()? {
        Some(row) => Ok(attach_photos(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn insert_account(&self, new: NewAccount) -> AppResult<Account> {
        self.run(move |conn| {
            diesel::insert_into(accounts::table)
                .values(&new)
                .get_result::<Account>(conn)
                .map_err(|e| {
                    let err = AppError::from(e);
                    if err.is_unique_violation() {
                        AppError::new(ErrorCode::EmailAlreadyExists, "email is already registered")
                    } else {
                        err
                    }
                })
        })
        .await
    }

    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        self.run(move |conn| Ok(accounts::table.find(id).first::<Account>(conn).optional()?))
            .await
    }

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let email = email.to_lowercase();
        self.run(move |conn| {
            Ok(accounts::table
                .filter(accounts::email.eq(email))
                .first::<Account>(conn)
                .optional()?)
        })
        .await
    }

    async fn find_account_by_confirmation_token(&self, token: &str) -> AppResult<Option<Account>> {
        let token = token.to_string();
        self.run(move |conn| {
            Ok(accounts::table
                .filter(accounts::confirmation_token.eq(token))
                .first::<Account>(conn)
                .optional()?)
        })
        .await
    }

    async fn find_account_by_reset_hash(&self, token_hash: &str) -> AppResult<Option<Account>> {
        let token_hash = token_hash.to_string();
        self.run(move |conn| {
            Ok(accounts::table
                .filter(accounts::reset_token_hash.eq(token_hash))
                .first::<Account>(conn)
                .optional()?)
        })
        .await
    }

    async fn update_account(&self, id: Uuid, changes: AccountChanges) -> AppResult<Option<Account>> {
        self.run(move |conn| {
            Ok(diesel::update(accounts::table.find(id))
                .set(changes)
                .get_result::<Account>(conn)
                .optional()?)
        })
        .await
    }

    async fn delete_account(&self, id: Uuid) -> AppResult<bool> {
        self.run(move |conn| Ok(diesel::delete(accounts::table.find(id)).execute(conn)? > 0))
            .await
    }

    async fn account_exists(&self, id: Uuid) -> AppResult<bool> {
        self.run(move |conn| {
            Ok(diesel::select(diesel::dsl::exists(accounts::table.find(id))).get_result::<bool>(conn)?)
        })
        .await
    }

    async fn ping(&self) -> AppResult<()> {
        self.run(|conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn insert_profile(&self, new: NewProfile) -> AppResult<Profile> {
        self.run(move |conn| {
            diesel::insert_into(profiles::table)
                .values(&new)
                .get_result::<Profile>(conn)
                .map_err(|e| {
                    if is_foreign_key_violation(&e) {
                        return AppError::new(ErrorCode::UserNotFound, "user not found");
                    }
                    let err = AppError::from(e);
                    if err.is_unique_violation() {
                        AppError::new(ErrorCode::ProfileAlreadyExists, "profile already exists")
                    } else {
                        err
                    }
                })
        })
        .await
    }

    async fn find_profile(&self, id: Uuid) -> AppResult<Option<ProfileBundle>> {
        self.run(move |conn| find_bundle(conn, BundleKey::Profile(id))).await
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> AppResult<Option<ProfileBundle>> {
        self.run(move |conn| find_bundle(conn, BundleKey::User(user_id))).await
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Option<Profile>> {
        self.run(move |conn| {
            Ok(diesel::update(profiles::table.find(id))
                .set(changes)
                .get_result::<Profile>(conn)
                .optional()?)
        })
        .await
    }

    async fn feed_page(&self, query: &FeedQuery) -> AppResult<Vec<ProfileBundle>> {
        let query = query.clone();
        self.run(move |conn| {
            let mut sql = profiles::table
                .inner_join(accounts::table)
                .filter(profiles::user_id.ne_all(query.exclude_user_ids.clone()))
                .filter(profiles::is_visible.eq(true))
                .filter(accounts::is_deactivated.eq(false))
                .filter(profiles::id.eq_any(photos::table.select(photos::profile_id)))
                .filter(
                    profiles::preferred_gender
                        .is_null()
                        .or(profiles::preferred_gender.assume_not_null().eq(query.requester_gender)),
                )
                .filter(
                    profiles::preferred_city_id
                        .is_null()
                        .or(profiles::preferred_city_id.assume_not_null().eq(query.requester_city_id)),
                )
                .filter(
                    profiles::preferred_age_min
                        .is_null()
                        .or(profiles::preferred_age_min.assume_not_null().le(query.requester_age)),
                )
                .filter(
                    profiles::preferred_age_max
                        .is_null()
                        .or(profiles::preferred_age_max.assume_not_null().ge(query.requester_age)),
                )
                .select((profiles::all_columns, accounts::email, accounts::is_deactivated))
                .into_boxed();

            if let Some(gender) = query.gender {
                sql = sql.filter(profiles::gender.eq(gender));
            }
            if let Some(city_id) = query.city_id {
                sql = sql.filter(profiles::city_id.eq(city_id));
            }
            if let Some(bound) = query.born_on_or_before {
                sql = sql.filter(profiles::birth_date.le(bound));
            }
            if let Some(bound) = query.born_after {
                sql = sql.filter(profiles::birth_date.gt(bound));
            }

            let rows = sql
                .order((profiles::created_at.desc(), profiles::id.desc()))
                .offset(query.offset)
                .limit(query.limit)
                .load::<BundleRow>(conn)?;

            Ok(attach_photos(conn, rows)?)
        })
        .await
    }
}

#[async_trait]
impl PhotoStore for PgStore {
    async fn list_photos(&self, profile_id: Uuid) -> AppResult<Vec<Photo>> {
        self.run(move |conn| {
            Ok(photos::table
                .filter(photos::profile_id.eq(profile_id))
                .order((photos::sort_order.asc(), photos::created_at.asc()))
                .load::<Photo>(conn)?)
        })
        .await
    }

    async fn insert_photo(&self, new: NewPhoto, limit: usize) -> AppResult<Photo> {
        self.run(move |conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                let mut new = new;
                lock_profile(conn, new.profile_id)?;

                let count: i64 = photos::table
                    .filter(photos::profile_id.eq(new.profile_id))
                    .count()
                    .get_result(conn)?;
                if usize::try_from(count).unwrap_or(usize::MAX) >= limit {
                    return Err(photo_limit_reached(limit));
                }
                let last_order: Option<i32> = photos::table
                    .filter(photos::profile_id.eq(new.profile_id))
                    .select(diesel::dsl::max(photos::sort_order))
                    .first(conn)?;

                new.is_main = new.is_main || count == 0;
                new.sort_order = last_order.map_or(0, |o| o + 1);

                if new.is_main {
                    diesel::update(photos::table.filter(photos::profile_id.eq(new.profile_id)))
                        .set(photos::is_main.eq(false))
                        .execute(conn)?;
                }
                Ok(diesel::insert_into(photos::table).values(&new).get_result::<Photo>(conn)?)
            })
        })
        .await
    }

    async fn delete_photo(&self, profile_id: Uuid, photo_id: Uuid) -> AppResult<Option<Photo>> {
        self.run(move |conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                lock_profile(conn, profile_id)?;
                let photo = photos::table
                    .filter(photos::id.eq(photo_id))
                    .filter(photos::profile_id.eq(profile_id))
                    .first::<Photo>(conn)
                    .optional()?;
                let Some(photo) = photo else {
                    return Ok(None);
                };

                let count: i64 = photos::table
                    .filter(photos::profile_id.eq(profile_id))
                    .count()
                    .get_result(conn)?;
                if count <= 1 {
                    return Err(last_photo_required());
                }

                diesel::delete(photos::table.find(photo.id)).execute(conn)?;

                if photo.is_main {
                    let next = photos::table
                        .filter(photos::profile_id.eq(profile_id))
                        .order((photos::sort_order.asc(), photos::created_at.asc()))
                        .select(photos::id)
                        .first::<Uuid>(conn)
                        .optional()?;
                    if let Some(next_id) = next {
                        diesel::update(photos::table.find(next_id))
                            .set(photos::is_main.eq(true))
                            .execute(conn)?;
                    }
                }

                Ok(Some(photo))
            })
        })
        .await
    }

    async fn set_main_photo(&self, profile_id: Uuid, photo_id: Uuid) -> AppResult<Option<Photo>> {
        self.run(move |conn| {
            conn.transaction::<_, AppError, _>(|conn| {
                let exists = photos::table
                    .filter(photos::id.eq(photo_id))
                    .filter(photos::profile_id.eq(profile_id))
                    .select(photos::id)
                    .first::<Uuid>(conn)
                    .optional()?;
                if exists.is_none() {
                    return Ok(None);
                }

                diesel::update(photos::table.filter(photos::profile_id.eq(profile_id)))
                    .set(photos::is_main.eq(false))
                    .execute(conn)?;
                let photo = diesel::update(photos::table.find(photo_id))
                    .set(photos::is_main.eq(true))
                    .get_result::<Photo>(conn)?;

                Ok(Some(photo))
            })
        })
        .await
    }
}

#[async_trait]
impl InteractionLedger for PgStore {
    async fn upsert_interaction(&self, from: Uuid, to: Uuid, kind: InteractionKind) -> AppResult<Interaction> {
        self.run(move |conn| {
            let new = NewInteraction { from_user_id: from, to_user_id: to, kind };
            Ok(diesel::insert_into(interactions::table)
                .values(&new)
                .on_conflict((interactions::from_user_id, interactions::to_user_id))
                .do_update()
                .set((interactions::kind.eq(kind), interactions::updated_at.eq(Utc::now())))
                .get_result::<Interaction>(conn)?)
        })
        .await
    }

    async fn find_interaction(&self, from: Uuid, to: Uuid) -> AppResult<Option<Interaction>> {
        self.run(move |conn| {
            Ok(interactions::table
                .filter(interactions::from_user_id.eq(from))
                .filter(interactions::to_user_id.eq(to))
                .first::<Interaction>(conn)
                .optional()?)
        })
        .await
    }

    async fn interacted_user_ids(&self, from: Uuid) -> AppResult<Vec<Uuid>> {
        self.run(move |conn| {
            Ok(interactions::table
                .filter(interactions::from_user_id.eq(from))
                .select(interactions::to_user_id)
                .load::<Uuid>(conn)?)
        })
        .await
    }
}

#[async_trait]
impl MatchRegistry for PgStore {
    async fn create_match_if_absent(&self, initiator: Uuid, other: Uuid) -> AppResult<Option<Match>> {
        self.run(move |conn| {
            // The unordered-pair unique index turns a concurrent duplicate into no row.
            Ok(diesel::insert_into(matches::table)
                .values(&NewMatch { user1_id: initiator, user2_id: other })
                .on_conflict_do_nothing()
                .get_result::<Match>(conn)
                .optional()?)
        })
        .await
    }

    async fn find_match_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<Match>> {
        self.run(move |conn| {
            Ok(matches::table
                .filter(
                    matches::user1_id
                        .eq(a)
                        .and(matches::user2_id.eq(b))
                        .or(matches::user1_id.eq(b).and(matches::user2_id.eq(a))),
                )
                .first::<Match>(conn)
                .optional()?)
        })
        .await
    }

    async fn matches_for_user(&self, user_id: Uuid) -> AppResult<Vec<Match>> {
        self.run(move |conn| {
            Ok(matches::table
                .filter(matches::user1_id.eq(user_id).or(matches::user2_id.eq(user_id)))
                .order((matches::created_at.desc(), matches::id.desc()))
                .load::<Match>(conn)?)
        })
        .await
    }

    async fn mark_viewed(&self, match_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        self.run(move |conn| {
            let as_user1 = diesel::update(
                matches::table
                    .filter(matches::id.eq(match_id))
                    .filter(matches::user1_id.eq(user_id)),
            )
            .set(matches::user1_viewed.eq(true))
            .execute(conn)?;
            if as_user1 > 0 {
                return Ok(true);
            }

            let as_user2 = diesel::update(
                matches::table
                    .filter(matches::id.eq(match_id))
                    .filter(matches::user2_id.eq(user_id)),
            )
            .set(matches::user2_viewed.eq(true))
            .execute(conn)?;
            Ok(as_user2 > 0)
        })
        .await
    }

    async fn count_unviewed(&self, user_id: Uuid) -> AppResult<i64> {
        self.run(move |conn| {
            Ok(matches::table
                .filter(
                    matches::user1_id
                        .eq(user_id)
                        .and(matches::user1_viewed.eq(false))
                        .or(matches::user2_id.eq(user_id).and(matches::user2_viewed.eq(false))),
                )
                .count()
                .get_result::<i64>(conn)?)
        })
        .await
    }
}
