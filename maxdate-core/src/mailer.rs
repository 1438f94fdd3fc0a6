use async_trait::async_trait;

use maxdate_shared::clients::email::EmailClient;

#[derive(Debug, thiserror::Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Outbound notifications. Callers log and swallow failures.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_confirmation(&self, to: &str, token: &str) -> Result<(), MailError>;
    async fn send_password_reset(&self, to: &str, token: &str) -> Result<(), MailError>;
    async fn send_match_notification(&self, to: &str, match_name: &str) -> Result<(), MailError>;
}

#[async_trait]
impl Mailer for EmailClient {
    async fn send_confirmation(&self, to: &str, token: &str) -> Result<(), MailError> {
        self.send_confirmation_link(to, token).await.map_err(MailError)
    }

    async fn send_password_reset(&self, to: &str, token: &str) -> Result<(), MailError> {
        self.send_password_reset_link(to, token).await.map_err(MailError)
    }

    async fn send_match_notification(&self, to: &str, match_name: &str) -> Result<(), MailError> {
        EmailClient::send_match_notification(self, to, match_name).await.map_err(MailError)
    }
}

/// Writes messages to the log instead of delivering them. Used when no
/// Resend key is configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_confirmation(&self, to: &str, token: &str) -> Result<(), MailError> {
        tracing::info!(to = %to, token = %token, "confirmation email (not delivered)");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, token: &str) -> Result<(), MailError> {
        tracing::info!(to = %to, token = %token, "password reset email (not delivered)");
        Ok(())
    }

    async fn send_match_notification(&self, to: &str, match_name: &str) -> Result<(), MailError> {
        tracing::info!(to = %to, match_name = %match_name, "match notification (not delivered)");
        Ok(())
    }
}
