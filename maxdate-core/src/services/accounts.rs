use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use maxdate_shared::errors::{AppError, AppResult, ErrorCode};

use crate::mailer::Mailer;
use crate::models::{Account, AccountChanges, NewAccount};
use crate::services::credentials;
use crate::storage::PhotoStorage;
use crate::store::{AccountStore, ProfileStore, Stores};

pub const MAX_FAILED_LOGINS: i32 = 5;
pub const LOCKOUT_MINUTES: i64 = 30;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: Account,
    pub has_profile: bool,
}

/// Account as shown to its owner. Secrets are never included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub email_confirmed: bool,
    pub is_active: bool,
    pub is_deactivated: bool,
    pub has_profile: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration, login with lockout, email confirmation, password reset and
/// account lifecycle.
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    profiles: Arc<dyn ProfileStore>,
    mailer: Arc<dyn Mailer>,
    storage: Arc<dyn PhotoStorage>,
}

impl AccountService {
    pub fn new(stores: &Stores, mailer: Arc<dyn Mailer>, storage: Arc<dyn PhotoStorage>) -> Self {
        Self {
            accounts: stores.accounts.clone(),
            profiles: stores.profiles.clone(),
            mailer,
            storage,
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> AppResult<Account> {
        let email = email.trim().to_lowercase();
        credentials::validate_email(&email)?;
        credentials::validate_password(password)?;

        if self.accounts.find_account_by_email(&email).await?.is_some() {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email is already registered"));
        }

        let token = credentials::generate_token();
        let account = self
            .accounts
            .insert_account(NewAccount {
                email,
                password_hash: credentials::hash_password(password)?,
                confirmation_token: Some(token.clone()),
            })
            .await?;

        if let Err(e) = self.mailer.send_confirmation(&account.email, &token).await {
            tracing::error!(user_id = %account.id, error = %e, "failed to send confirmation email");
        }

        tracing::info!(user_id = %account.id, "account registered");
        Ok(account)
    }

    /// Consumes a confirmation token. Tokens are single use.
    pub async fn confirm_email(&self, token: &str) -> AppResult<()> {
        let invalid = || AppError::new(ErrorCode::ConfirmationTokenInvalid, "invalid confirmation token");
        if token.is_empty() {
            return Err(invalid());
        }

        let account = self
            .accounts
            .find_account_by_confirmation_token(token)
            .await?
            .ok_or_else(invalid)?;

        self.accounts
            .update_account(
                account.id,
                AccountChanges {
                    email_confirmed: Some(true),
                    confirmation_token: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %account.id, "email confirmed");
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginOutcome> {
        let invalid = || AppError::new(ErrorCode::InvalidCredentials, "invalid email or password");
        let now = Utc::now();

        let account = self
            .accounts
            .find_account_by_email(email.trim())
            .await?
            .ok_or_else(invalid)?;

        if account.is_locked_at(now) {
            return Err(AppError::new(
                ErrorCode::AccountLocked,
                format!("account is locked, try again in {LOCKOUT_MINUTES} minutes"),
            ));
        }
        if account.is_deactivated {
            return Err(AppError::new(ErrorCode::AccountDeactivated, "account is deactivated"));
        }

        if !credentials::verify_password(password, &account.password_hash)? {
            self.record_failed_login(&account, now).await?;
            return Err(invalid());
        }

        if account.failed_login_attempts > 0 || account.locked_until.is_some() {
            self.accounts
                .update_account(
                    account.id,
                    AccountChanges {
                        failed_login_attempts: Some(0),
                        locked_until: Some(None),
                        ..Default::default()
                    },
                )
                .await?;
        }

        if !account.email_confirmed {
            return Err(AppError::new(ErrorCode::EmailNotConfirmed, "please confirm your email before logging in"));
        }

        let has_profile = self.profiles.find_profile_by_user(account.id).await?.is_some();
        tracing::info!(user_id = %account.id, "user logged in");
        Ok(LoginOutcome { account, has_profile })
    }

    async fn record_failed_login(&self, account: &Account, now: DateTime<Utc>) -> AppResult<()> {
        let attempts = account.failed_login_attempts + 1;
        let locked_until = (attempts >= MAX_FAILED_LOGINS).then(|| now + Duration::minutes(LOCKOUT_MINUTES));

        self.accounts
            .update_account(
                account.id,
                AccountChanges {
                    failed_login_attempts: Some(attempts),
                    locked_until: locked_until.map(Some),
                    ..Default::default()
                },
            )
            .await?;

        if locked_until.is_some() {
            tracing::warn!(user_id = %account.id, attempts, "account locked after failed logins");
        } else {
            tracing::debug!(user_id = %account.id, attempts, "failed login");
        }
        Ok(())
    }

    /// Issues a reset link when the email is registered. The outcome is the
    /// same either way.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let Some(account) = self.accounts.find_account_by_email(email.trim()).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = credentials::generate_token();
        self.accounts
            .update_account(
                account.id,
                AccountChanges {
                    reset_token_hash: Some(Some(credentials::hash_token(&token))),
                    reset_expires_at: Some(Some(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES))),
                    ..Default::default()
                },
            )
            .await?;

        if let Err(e) = self.mailer.send_password_reset(&account.email, &token).await {
            tracing::error!(user_id = %account.id, error = %e, "failed to send password reset email");
        }

        tracing::info!(user_id = %account.id, "password reset requested");
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        credentials::validate_password(new_password)?;

        let invalid = || AppError::new(ErrorCode::ResetTokenInvalid, "invalid password reset token");
        if token.is_empty() {
            return Err(invalid());
        }

        let account = self
            .accounts
            .find_account_by_reset_hash(&credentials::hash_token(token))
            .await?
            .ok_or_else(invalid)?;

        if account.reset_expires_at.is_some_and(|expires| expires < Utc::now()) {
            return Err(AppError::new(ErrorCode::ResetTokenExpired, "password reset token has expired"));
        }

        self.accounts
            .update_account(
                account.id,
                AccountChanges {
                    password_hash: Some(credentials::hash_password(new_password)?),
                    reset_token_hash: Some(None),
                    reset_expires_at: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %account.id, "password reset");
        Ok(())
    }

    pub async fn change_password(&self, user_id: Uuid, old_password: &str, new_password: &str) -> AppResult<()> {
        credentials::validate_password(new_password)?;
        let account = self.require_account(user_id).await?;

        if !credentials::verify_password(old_password, &account.password_hash)? {
            return Err(AppError::new(ErrorCode::WrongPassword, "current password is incorrect"));
        }
        if credentials::verify_password(new_password, &account.password_hash)? {
            return Err(AppError::new(ErrorCode::PasswordReused, "new password must differ from the current one"));
        }

        self.accounts
            .update_account(
                user_id,
                AccountChanges {
                    password_hash: Some(credentials::hash_password(new_password)?),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, "password changed");
        Ok(())
    }

    pub async fn get_account(&self, user_id: Uuid) -> AppResult<AccountView> {
        let account = self.require_account(user_id).await?;
        let has_profile = self.profiles.find_profile_by_user(user_id).await?.is_some();

        Ok(AccountView {
            id: account.id,
            email: account.email,
            email_confirmed: account.email_confirmed,
            is_active: account.is_active,
            is_deactivated: account.is_deactivated,
            has_profile,
            created_at: account.created_at,
            updated_at: account.updated_at,
        })
    }

    /// Hard delete. Rows cascade; stored photo objects are removed best effort.
    pub async fn delete_account(&self, user_id: Uuid) -> AppResult<()> {
        let storage_keys: Vec<String> = self
            .profiles
            .find_profile_by_user(user_id)
            .await?
            .map(|bundle| bundle.photos.into_iter().map(|p| p.storage_key).collect())
            .unwrap_or_default();

        if !self.accounts.delete_account(user_id).await? {
            return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
        }

        for key in storage_keys {
            if let Err(e) = self.storage.remove(&key).await {
                tracing::warn!(key = %key, error = %e, "failed to remove photo object");
            }
        }

        tracing::info!(user_id = %user_id, "account deleted");
        Ok(())
    }

    pub async fn deactivate_account(&self, user_id: Uuid) -> AppResult<()> {
        self.accounts
            .update_account(
                user_id,
                AccountChanges {
                    is_deactivated: Some(true),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

        tracing::info!(user_id = %user_id, "account deactivated");
        Ok(())
    }

    async fn require_account(&self, user_id: Uuid) -> AppResult<Account> {
        self.accounts
            .find_account(user_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))
    }
}
