#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use maxdate_api::config::AppConfig;
use maxdate_api::{create_router, AppState};
use maxdate_core::mailer::{MailError, Mailer};
use maxdate_core::{CityDirectory, MemoryPhotoStorage, Stores};

pub const PASSWORD: &str = "Пароль123";
const BOUNDARY: &str = "maxdate-test-boundary";

/// Remembers the last confirmation and reset tokens handed out.
#[derive(Default)]
pub struct CapturingMailer {
    confirmations: Mutex<Vec<(String, String)>>,
    resets: Mutex<Vec<(String, String)>>,
    matches: Mutex<Vec<(String, String)>>,
}

impl CapturingMailer {
    pub fn confirmation_token_for(&self, email: &str) -> Option<String> {
        let sent = self.confirmations.lock().unwrap();
        sent.iter().rev().find(|(to, _)| to == email).map(|(_, t)| t.clone())
    }

    pub fn reset_token_for(&self, email: &str) -> Option<String> {
        let sent = self.resets.lock().unwrap();
        sent.iter().rev().find(|(to, _)| to == email).map(|(_, t)| t.clone())
    }

    pub fn match_notifications(&self) -> usize {
        self.matches.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_confirmation(&self, to: &str, token: &str) -> Result<(), MailError> {
        self.confirmations.lock().unwrap().push((to.into(), token.into()));
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, token: &str) -> Result<(), MailError> {
        self.resets.lock().unwrap().push((to.into(), token.into()));
        Ok(())
    }

    async fn send_match_notification(&self, to: &str, match_name: &str) -> Result<(), MailError> {
        self.matches.lock().unwrap().push((to.into(), match_name.into()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub mailer: Arc<CapturingMailer>,
    pub storage: Arc<MemoryPhotoStorage>,
}

pub fn create_test_app() -> TestApp {
    let mailer = Arc::new(CapturingMailer::default());
    let storage = Arc::new(MemoryPhotoStorage::new("http://photos.test"));
    let cities = Arc::new(CityDirectory::embedded().expect("embedded cities"));
    let config = AppConfig {
        jwt_secret: "test-secret".into(),
        ..AppConfig::default()
    };

    let state = AppState::new(config, Stores::memory(), mailer.clone(), storage.clone(), cities, None);
    TestApp {
        router: create_router(Arc::new(state)),
        mailer,
        storage,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request("GET", uri, token).body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request("DELETE", uri, token).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.json("POST", uri, token, body).await
    }

    pub async fn put_json(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.json("PUT", uri, token, body).await
    }

    async fn json(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        let req = request(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub async fn upload_photo(&self, uri: &str, token: &str, content_type: &str, bytes: &[u8]) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"photo.png\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let req = request("POST", uri, Some(token))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    /// Registers, confirms and logs in; returns `(user_id, access_token)`.
    pub async fn signed_in(&self, email: &str) -> (String, String) {
        let registered = self
            .post_json("/api/auth/register", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);

        let token = self.mailer.confirmation_token_for(email).unwrap();
        let confirmed = self.get(&format!("/api/auth/confirm-email?token={token}"), None).await;
        assert_eq!(confirmed.status, StatusCode::OK);

        let login = self
            .post_json("/api/auth/login", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);

        (
            login.data()["user"]["id"].as_str().unwrap().to_string(),
            login.data()["accessToken"].as_str().unwrap().to_string(),
        )
    }

    /// A signed-in user with a profile and one photo.
    pub async fn member(&self, email: &str, first_name: &str, gender: &str, birth_date: &str) -> (String, String) {
        let (user_id, token) = self.signed_in(email).await;

        let created = self
            .post_json("/api/profiles", Some(&token), profile_body(first_name, gender, birth_date))
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);

        let photo = self.upload_photo("/api/profiles/photos", &token, "image/png", PNG).await;
        assert_eq!(photo.status, StatusCode::CREATED, "{:?}", photo.body);

        (user_id, token)
    }
}

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

pub fn profile_body(first_name: &str, gender: &str, birth_date: &str) -> Value {
    json!({
        "firstName": first_name,
        "lastName": "Тестова",
        "birthDate": birth_date,
        "gender": gender,
        "cityId": 1,
        "vkLink": "@tester"
    })
}

fn request(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}
