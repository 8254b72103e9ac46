#![allow(dead_code)]

use askhub::api::{self, AppState};
use askhub::config::Config;
use askhub::services::{AccountMail, AvatarStorage, MailPurpose, Mailer, StorageError};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Username/password seeded by the initial migration
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "password";

/// Mailer fake that records every dispatched message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<AccountMail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mails(&self) -> Vec<AccountMail> {
        self.sent.lock().unwrap().clone()
    }

    /// Most recent token mailed to `email`, regardless of purpose.
    pub fn last_token_to(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == email)
            .map(|m| m.token.clone())
    }

    pub fn last_purpose_to(&self, email: &str) -> Option<MailPurpose> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == email)
            .map(|m| m.purpose)
    }

    pub fn count_to(&self, email: &str) -> usize {
        self.sent.lock().unwrap().iter().filter(|m| m.to == email).count()
    }
}

impl Mailer for RecordingMailer {
    fn dispatch(&self, mail: AccountMail) {
        self.sent.lock().unwrap().push(mail);
    }
}

/// Storage fake that records deleted object keys.
#[derive(Default)]
pub struct RecordingStorage {
    deleted: Mutex<Vec<String>>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AvatarStorage for RecordingStorage {
    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: Arc<AppState>,
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<RecordingStorage>,
}

pub async fn spawn_app() -> TestApp {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A single connection keeps the in-memory database alive and shared
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    // Cheap hashing keeps the test suite fast
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let mailer = Arc::new(RecordingMailer::new());
    let storage = Arc::new(RecordingStorage::new());

    let state = api::create_app_state(
        config,
        mailer.clone() as Arc<dyn Mailer>,
        storage.clone() as Arc<dyn AvatarStorage>,
        None,
    )
    .await
    .expect("Failed to create app state");

    TestApp {
        app: api::router(state.clone()),
        state,
        mailer,
        storage,
    }
}

/// Fire a request at the router and collect (status, parsed body).
/// An empty body (204 responses) comes back as `Value::Null`.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = if let Some(json) = body {
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

/// Log in and return (access, refresh). Panics when login fails.
pub async fn login(app: &Router, username: &str, password: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "login failed: {body}");

    (
        body["data"]["access"].as_str().unwrap().to_string(),
        body["data"]["refresh"].as_str().unwrap().to_string(),
    )
}

/// Register an account. Does not verify it.
pub async fn register(app: &Router, username: &str, email: &str, password: &str) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
            "confirm_password": password,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
}

/// Register and activate an account via the emailed token, returning the
/// new user's id.
pub async fn register_and_verify(
    test_app: &TestApp,
    username: &str,
    email: &str,
    password: &str,
) -> i64 {
    register(&test_app.app, username, email, password).await;

    let token = test_app
        .mailer
        .last_token_to(email)
        .expect("no verification mail recorded");

    let (status, body) = send(
        &test_app.app,
        "GET",
        &format!("/api/auth/verify/{token}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "verify failed: {body}");

    lookup_user_id(test_app, username).await
}

/// Resolve a username to its id through the admin listing.
pub async fn lookup_user_id(test_app: &TestApp, username: &str) -> i64 {
    let (admin_access, _) = login(&test_app.app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let (status, body) = send(
        &test_app.app,
        "GET",
        &format!("/api/users?search={username}"),
        Some(&admin_access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "user lookup failed: {body}");

    body["data"]["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == username)
        .expect("user not in listing")["id"]
        .as_i64()
        .unwrap()
}

/// Fetch a user row from the admin listing.
pub async fn admin_view_of(test_app: &TestApp, username: &str) -> serde_json::Value {
    let (admin_access, _) = login(&test_app.app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let (status, body) = send(
        &test_app.app,
        "GET",
        &format!("/api/users?search={username}"),
        Some(&admin_access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    body["data"]["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == username)
        .expect("user not in listing")
        .clone()
}
