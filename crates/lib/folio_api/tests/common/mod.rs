//! Shared harness: in-memory store, recording notifier, request helpers.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use folio_api::config::ApiConfig;
use folio_api::{AppState, router};
use folio_core::auth::password;
use folio_core::models::{NewUser, User, UserType};
use folio_core::notify::{NotificationError, Notifier};
use folio_core::store::{MemoryUserStore, UserStore};
use serde_json::Value;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery";

#[derive(Debug, Clone)]
pub struct Sent {
    pub to: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Sent>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(
        &self,
        to: &str,
        _subject: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(Sent {
            to: to.into(),
            body: body.into(),
        });
        Ok(())
    }

    async fn send_sms(
        &self,
        country_code: &str,
        mobile: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(Sent {
            to: format!("{country_code}{mobile}"),
            body: body.into(),
        });
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_email(&self, _: &str, _: &str, _: &str) -> Result<(), NotificationError> {
        Err(NotificationError::Email("smtp unreachable".into()))
    }

    async fn send_sms(&self, _: &str, _: &str, _: &str) -> Result<(), NotificationError> {
        Err(NotificationError::Sms("gateway unreachable".into()))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryUserStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ApiConfig::ephemeral())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        let store = Arc::new(MemoryUserStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(config, store.clone(), notifier.clone());
        let router = router(state.clone());
        Self {
            state,
            store,
            notifier,
            router,
        }
    }

    /// Same store and config, different notifier.
    pub fn with_notifier(&self, notifier: Arc<dyn Notifier>) -> Router {
        let state = AppState::new(self.state.config.clone(), self.store.clone(), notifier);
        router(state)
    }

    pub async fn seed(&self, username: &str, user_type: UserType) -> User {
        let (hash, salt) = password::new_password_hash(PASSWORD).unwrap();
        self.store
            .create_user(
                NewUser {
                    name: format!("{username} name"),
                    email: Some(format!("{username}@example.com")),
                    mobile: None,
                    country_code: None,
                    username: username.into(),
                    user_type,
                },
                &hash,
                &salt,
            )
            .await
            .unwrap()
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Option<Value>) {
        send(&self.router, req).await
    }

    /// Log in with [`PASSWORD`] and return the token response.
    pub async fn login(&self, username: &str) -> Value {
        let (status, body) = self
            .send(post_json(
                "/auth/login",
                serde_json::json!({ "username": username, "password": PASSWORD }),
                None,
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed for {username}");
        body.unwrap()
    }
}

pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Option<Value>) {
    let resp = router.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    if bytes.is_empty() {
        (status, None)
    } else {
        (status, Some(serde_json::from_slice(&bytes).expect("parse JSON")))
    }
}

pub fn request(
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    request("POST", uri, Some(body), token)
}

pub fn get(uri: &str, token: &str) -> Request<Body> {
    request("GET", uri, None, Some(token))
}

pub fn access_token(tokens: &Value) -> &str {
    tokens["accessToken"].as_str().unwrap()
}

pub fn refresh_token(tokens: &Value) -> &str {
    tokens["refreshToken"].as_str().unwrap()
}

/// Pull the reset token out of a notification body.
pub fn reset_token_from(body: &str) -> String {
    let start = body.find("token=").expect("reset link in body") + "token=".len();
    body[start..]
        .split_whitespace()
        .next()
        .unwrap()
        .to_string()
}
