mod common;

use chrono::{Duration, Utc};

use common::{born_years_ago, Harness, SentMail};
use maxdate_core::models::{AccountChanges, Gender};
use maxdate_core::services::accounts::MAX_FAILED_LOGINS;
use maxdate_shared::errors::ErrorCode;

const PASSWORD: &str = "Пароль123";
const NEW_PASSWORD: &str = "НовыйПароль42";

/// Registers and confirms an account through the service.
async fn confirmed(h: &Harness, email: &str) -> uuid::Uuid {
    let account = h.accounts.register(email, PASSWORD).await.unwrap();
    let token = h.mailer.last_confirmation_token().unwrap();
    h.accounts.confirm_email(&token).await.unwrap();
    account.id
}

#[tokio::test]
async fn registration_normalizes_email_and_sends_a_confirmation() {
    let h = Harness::new();

    let account = h.accounts.register("  Anna@Mail.RU ", PASSWORD).await.unwrap();

    assert_eq!(account.email, "anna@mail.ru");
    assert!(!account.email_confirmed);
    assert_ne!(account.password_hash, PASSWORD);
    match h.mailer.sent().as_slice() {
        [SentMail::Confirmation { to, token }] => {
            assert_eq!(to, "anna@mail.ru");
            assert_eq!(account.confirmation_token.as_deref(), Some(token.as_str()));
        }
        other => panic!("unexpected mail: {other:?}"),
    }
}

#[tokio::test]
async fn registration_rejects_bad_input_and_duplicates() {
    let h = Harness::new();

    let err = h.accounts.register("anna@gmail.com", PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidEmail);

    let err = h.accounts.register("anna@mail.ru", "password1").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PasswordTooWeak);

    h.accounts.register("anna@mail.ru", PASSWORD).await.unwrap();
    let err = h.accounts.register("ANNA@mail.ru", PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::EmailAlreadyExists);
}

#[tokio::test]
async fn login_requires_a_confirmed_email() {
    let h = Harness::new();
    h.accounts.register("anna@mail.ru", PASSWORD).await.unwrap();

    let err = h.accounts.login("anna@mail.ru", PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::EmailNotConfirmed);

    let token = h.mailer.last_confirmation_token().unwrap();
    h.accounts.confirm_email(&token).await.unwrap();

    let outcome = h.accounts.login("anna@mail.ru", PASSWORD).await.unwrap();
    assert!(!outcome.has_profile);
}

#[tokio::test]
async fn confirmation_tokens_are_single_use() {
    let h = Harness::new();
    h.accounts.register("anna@mail.ru", PASSWORD).await.unwrap();
    let token = h.mailer.last_confirmation_token().unwrap();

    h.accounts.confirm_email(&token).await.unwrap();
    let err = h.accounts.confirm_email(&token).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfirmationTokenInvalid);

    let err = h.accounts.confirm_email("").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfirmationTokenInvalid);
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let h = Harness::new();
    confirmed(&h, "anna@mail.ru").await;

    let unknown = h.accounts.login("olga@mail.ru", PASSWORD).await.unwrap_err();
    let wrong = h.accounts.login("anna@mail.ru", "Пароль999").await.unwrap_err();
    assert_eq!(unknown.code(), ErrorCode::InvalidCredentials);
    assert_eq!(wrong.code(), ErrorCode::InvalidCredentials);
}

#[tokio::test]
async fn repeated_failures_lock_the_account() {
    let h = Harness::new();
    let id = confirmed(&h, "anna@mail.ru").await;

    for _ in 0..MAX_FAILED_LOGINS {
        let err = h.accounts.login("anna@mail.ru", "Пароль999").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCredentials);
    }

    let err = h.accounts.login("anna@mail.ru", PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::AccountLocked);

    // Once the lock has passed, a good password clears the counters.
    h.stores
        .accounts
        .update_account(id, AccountChanges { locked_until: Some(Some(Utc::now() - Duration::minutes(1))), ..Default::default() })
        .await
        .unwrap();
    h.accounts.login("anna@mail.ru", PASSWORD).await.unwrap();

    let account = h.stores.accounts.find_account(id).await.unwrap().unwrap();
    assert_eq!(account.failed_login_attempts, 0);
    assert!(account.locked_until.is_none());
}

#[tokio::test]
async fn password_reset_flow() {
    let h = Harness::new();
    confirmed(&h, "anna@mail.ru").await;

    h.accounts.request_password_reset("nobody@mail.ru").await.unwrap();
    assert!(h.mailer.last_reset_token().is_none());

    h.accounts.request_password_reset("anna@mail.ru").await.unwrap();
    let token = h.mailer.last_reset_token().unwrap();

    let err = h.accounts.reset_password("not-the-token", NEW_PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ResetTokenInvalid);

    h.accounts.reset_password(&token, NEW_PASSWORD).await.unwrap();
    h.accounts.login("anna@mail.ru", NEW_PASSWORD).await.unwrap();

    let err = h.accounts.reset_password(&token, NEW_PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ResetTokenInvalid);
}

#[tokio::test]
async fn expired_reset_tokens_are_refused() {
    let h = Harness::new();
    let id = confirmed(&h, "anna@mail.ru").await;
    h.accounts.request_password_reset("anna@mail.ru").await.unwrap();
    let token = h.mailer.last_reset_token().unwrap();

    h.stores
        .accounts
        .update_account(id, AccountChanges { reset_expires_at: Some(Some(Utc::now() - Duration::minutes(1))), ..Default::default() })
        .await
        .unwrap();

    let err = h.accounts.reset_password(&token, NEW_PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ResetTokenExpired);
}

#[tokio::test]
async fn change_password_checks_old_and_rejects_reuse() {
    let h = Harness::new();
    let id = confirmed(&h, "anna@mail.ru").await;

    let err = h.accounts.change_password(id, "Пароль999", NEW_PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::WrongPassword);

    let err = h.accounts.change_password(id, PASSWORD, PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PasswordReused);

    h.accounts.change_password(id, PASSWORD, NEW_PASSWORD).await.unwrap();
    h.accounts.login("anna@mail.ru", NEW_PASSWORD).await.unwrap();
}

#[tokio::test]
async fn deactivated_accounts_cannot_log_in() {
    let h = Harness::new();
    let id = confirmed(&h, "anna@mail.ru").await;

    h.accounts.deactivate_account(id).await.unwrap();

    let err = h.accounts.login("anna@mail.ru", PASSWORD).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::AccountDeactivated);
    assert!(h.accounts.get_account(id).await.unwrap().is_deactivated);
}

#[tokio::test]
async fn deleting_an_account_removes_everything_it_owns() {
    let h = Harness::new();
    let anna = confirmed(&h, "anna@mail.ru").await;
    h.profile(anna, "Анна", Gender::Female, born_years_ago(28)).await;
    h.upload(anna).await;
    let ivan = h.member("Иван", Gender::Male, 30).await;
    h.engine.like(anna, ivan).await.unwrap();
    h.engine.like(ivan, anna).await.unwrap();
    assert_eq!(h.storage.len().await, 2);

    h.accounts.delete_account(anna).await.unwrap();

    assert!(h.stores.accounts.find_account(anna).await.unwrap().is_none());
    assert!(h.stores.profiles.find_profile_by_user(anna).await.unwrap().is_none());
    assert!(h.stores.matches.find_match_between(anna, ivan).await.unwrap().is_none());
    assert!(h.stores.interactions.find_interaction(ivan, anna).await.unwrap().is_none());
    assert_eq!(h.storage.len().await, 1);

    let err = h.accounts.delete_account(anna).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::UserNotFound);
}

#[tokio::test]
async fn account_view_reports_profile_presence() {
    let h = Harness::new();
    let id = confirmed(&h, "anna@mail.ru").await;
    assert!(!h.accounts.get_account(id).await.unwrap().has_profile);

    h.profile(id, "Анна", Gender::Female, born_years_ago(28)).await;
    let view = h.accounts.get_account(id).await.unwrap();
    assert!(view.has_profile && view.email_confirmed);
}
