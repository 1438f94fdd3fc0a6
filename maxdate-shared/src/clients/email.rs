use reqwest::Client;
use serde::Serialize;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Transactional mail over the Resend HTTP API.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
    frontend_url: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

impl EmailClient {
    pub fn new(api_key: &str, from_email: &str, from_name: &str, frontend_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("email send failed: {e}"))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("email API error: {body}"));
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }

    pub async fn send_confirmation_link(&self, to: &str, token: &str) -> Result<(), String> {
        let url = format!("{}/confirm-email.html?token={token}", self.frontend_url);
        let html = layout(
            "Подтверждение email",
            &format!(
                "<p>Благодарим за регистрацию на MaxDate!</p>\
                 <p>Для подтверждения email перейдите по ссылке:</p>{}\
                 <p style=\"color: #666;\">Если вы не регистрировались на MaxDate, проигнорируйте это письмо.</p>",
                button(&url, "Подтвердить email")
            ),
        );

        self.send_email(to, "Подтверждение регистрации на MaxDate", &html).await
    }

    pub async fn send_password_reset_link(&self, to: &str, token: &str) -> Result<(), String> {
        let url = format!("{}/reset-password.html?token={token}", self.frontend_url);
        let html = layout(
            "Сброс пароля",
            &format!(
                "<p>Вы запросили сброс пароля для аккаунта MaxDate.</p>{}\
                 <p style=\"color: #666;\">Ссылка действительна в течение 1 часа.</p>",
                button(&url, "Сбросить пароль")
            ),
        );

        self.send_email(to, "Сброс пароля на MaxDate", &html).await
    }

    pub async fn send_match_notification(&self, to: &str, match_name: &str) -> Result<(), String> {
        let url = format!("{}/matches.html", self.frontend_url);
        let html = layout(
            "Взаимный лайк!",
            &format!(
                "<p>Вы понравились пользователю <strong>{match_name}</strong>, и это взаимно!</p>{}",
                button(&url, "Посмотреть мэтчи")
            ),
        );

        self.send_email(to, "У вас новый мэтч на MaxDate!", &html).await
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
        <h1 style="color: #e91e63;">MaxDate</h1>
        <h2>{title}</h2>
        {body}
        </div>"#
    )
}

fn button(url: &str, label: &str) -> String {
    format!(
        r#"<a href="{url}" style="display: inline-block; padding: 12px 24px; background-color: #e91e63; color: white; text-decoration: none; border-radius: 4px; margin: 16px 0;">{label}</a>"#
    )
}
