use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{accounts, interactions, matches, photos, profiles};

/// Stores a string-backed enum in a `Text`/`Varchar` column.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unrecognized {} value: {other}", stringify!($ty))),
                }
            }
        }

        impl ToSql<Text, Pg> for $ty {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $ty {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = std::str::from_utf8(bytes.as_bytes())?;
                Ok(raw.parse()?)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

text_enum!(Gender { Male => "male", Female => "female" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Like,
    Dislike,
}

text_enum!(InteractionKind { Like => "like", Dislike => "dislike" });

// --- Account ---

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = accounts)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub email_confirmed: bool,
    pub confirmation_token: Option<String>,
    pub reset_token_hash: Option<String>,
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_deactivated: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub confirmation_token: Option<String>,
}

/// Partial account update. `None` leaves a column untouched; for nullable
/// columns `Some(None)` writes NULL.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = accounts)]
pub struct AccountChanges {
    pub password_hash: Option<String>,
    pub email_confirmed: Option<bool>,
    pub confirmation_token: Option<Option<String>>,
    pub reset_token_hash: Option<Option<String>>,
    pub reset_expires_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
    pub is_deactivated: Option<bool>,
    pub failed_login_attempts: Option<i32>,
    pub locked_until: Option<Option<DateTime<Utc>>>,
    pub updated_at: DateTime<Utc>,
}

impl Default for AccountChanges {
    fn default() -> Self {
        Self {
            password_hash: None,
            email_confirmed: None,
            confirmation_token: None,
            reset_token_hash: None,
            reset_expires_at: None,
            is_active: None,
            is_deactivated: None,
            failed_login_attempts: None,
            locked_until: None,
            updated_at: Utc::now(),
        }
    }
}

impl AccountChanges {
    pub(crate) fn apply(self, account: &mut Account) {
        if let Some(v) = self.password_hash { account.password_hash = v; }
        if let Some(v) = self.email_confirmed { account.email_confirmed = v; }
        if let Some(v) = self.confirmation_token { account.confirmation_token = v; }
        if let Some(v) = self.reset_token_hash { account.reset_token_hash = v; }
        if let Some(v) = self.reset_expires_at { account.reset_expires_at = v; }
        if let Some(v) = self.is_active { account.is_active = v; }
        if let Some(v) = self.is_deactivated { account.is_deactivated = v; }
        if let Some(v) = self.failed_login_attempts { account.failed_login_attempts = v; }
        if let Some(v) = self.locked_until { account.locked_until = v; }
        account.updated_at = self.updated_at;
    }
}

// --- Profile ---

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub city_id: i32,
    pub vk_link: Option<String>,
    pub max_link: Option<String>,
    pub bio: Option<String>,
    pub hide_email: bool,
    pub is_visible: bool,
    pub preferred_gender: Option<Gender>,
    pub preferred_age_min: Option<i32>,
    pub preferred_age_max: Option<i32>,
    pub preferred_city_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: Uuid,
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

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = profiles)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<Option<String>>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub city_id: Option<i32>,
    pub vk_link: Option<Option<String>>,
    pub max_link: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub hide_email: Option<bool>,
    pub is_visible: Option<bool>,
    pub preferred_gender: Option<Option<Gender>>,
    pub preferred_age_min: Option<Option<i32>>,
    pub preferred_age_max: Option<Option<i32>>,
    pub preferred_city_id: Option<Option<i32>>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ProfileChanges {
    fn default() -> Self {
        Self {
            first_name: None,
            last_name: None,
            middle_name: None,
            birth_date: None,
            gender: None,
            city_id: None,
            vk_link: None,
            max_link: None,
            bio: None,
            hide_email: None,
            is_visible: None,
            preferred_gender: None,
            preferred_age_min: None,
            preferred_age_max: None,
            preferred_city_id: None,
            updated_at: Utc::now(),
        }
    }
}

impl ProfileChanges {
    /// Applies the changes to a copy of `profile`, giving the merged state.
    pub fn merged_into(&self, profile: &Profile) -> Profile {
        let mut merged = profile.clone();
        self.clone().apply(&mut merged);
        merged
    }

    pub(crate) fn apply(self, profile: &mut Profile) {
        if let Some(v) = self.first_name { profile.first_name = v; }
        if let Some(v) = self.last_name { profile.last_name = v; }
        if let Some(v) = self.middle_name { profile.middle_name = v; }
        if let Some(v) = self.birth_date { profile.birth_date = v; }
        if let Some(v) = self.gender { profile.gender = v; }
        if let Some(v) = self.city_id { profile.city_id = v; }
        if let Some(v) = self.vk_link { profile.vk_link = v; }
        if let Some(v) = self.max_link { profile.max_link = v; }
        if let Some(v) = self.bio { profile.bio = v; }
        if let Some(v) = self.hide_email { profile.hide_email = v; }
        if let Some(v) = self.is_visible { profile.is_visible = v; }
        if let Some(v) = self.preferred_gender { profile.preferred_gender = v; }
        if let Some(v) = self.preferred_age_min { profile.preferred_age_min = v; }
        if let Some(v) = self.preferred_age_max { profile.preferred_age_max = v; }
        if let Some(v) = self.preferred_city_id { profile.preferred_city_id = v; }
        profile.updated_at = self.updated_at;
    }
}

// --- Photo ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = photos)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: Uuid,
    pub profile_id: Uuid,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub url: String,
    pub original_name: String,
    pub mime_type: String,
    #[serde(rename = "size")]
    pub size_bytes: i64,
    pub is_main: bool,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = photos)]
pub struct NewPhoto {
    pub profile_id: Uuid,
    pub storage_key: String,
    pub url: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Requested by the uploader; the store forces it for a profile's first photo.
    pub is_main: bool,
    /// Assigned by the store.
    pub sort_order: i32,
}

/// Main photo first, then by position.
pub fn sort_for_display(photos: &mut [Photo]) {
    photos.sort_by_key(|p| (!p.is_main, p.sort_order));
}

// --- Interaction ---

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = interactions)]
pub struct Interaction {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub kind: InteractionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = interactions)]
pub struct NewInteraction {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub kind: InteractionKind,
}

// --- Match ---

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub user1_viewed: bool,
    pub user2_viewed: bool,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// Whether this match joins `a` and `b`, in either orientation.
    pub fn pairs(&self, a: Uuid, b: Uuid) -> bool {
        (self.user1_id == a && self.user2_id == b) || (self.user1_id == b && self.user2_id == a)
    }

    pub fn counterpart_of(&self, user_id: Uuid) -> Uuid {
        if self.user1_id == user_id { self.user2_id } else { self.user1_id }
    }

    pub fn viewed_by(&self, user_id: Uuid) -> bool {
        if self.user1_id == user_id { self.user1_viewed } else { self.user2_viewed }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(is_main: bool, sort_order: i32) -> Photo {
        Photo {
            id: Uuid::new_v4(),
            profile_id: Uuid::nil(),
            storage_key: String::new(),
            url: String::new(),
            original_name: String::new(),
            mime_type: "image/png".into(),
            size_bytes: 1,
            is_main,
            sort_order,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn main_photo_sorts_first() {
        let mut photos = vec![photo(false, 0), photo(false, 1), photo(true, 2)];
        sort_for_display(&mut photos);
        assert!(photos[0].is_main);
        assert_eq!(photos[1].sort_order, 0);
        assert_eq!(photos[2].sort_order, 1);
    }

    #[test]
    fn enums_round_trip_through_text() {
        assert_eq!("female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!(InteractionKind::Dislike.to_string(), "dislike");
        assert!("unknown".parse::<Gender>().is_err());
    }

    #[test]
    fn match_sides_resolve_per_user() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let m = Match {
            id: Uuid::new_v4(),
            user1_id: a,
            user2_id: b,
            user1_viewed: true,
            user2_viewed: false,
            created_at: Utc::now(),
        };
        assert!(m.pairs(b, a));
        assert_eq!(m.counterpart_of(b), a);
        assert!(m.viewed_by(a));
        assert!(!m.viewed_by(b));
    }
}
