//! Shared fixtures for the router-level tests: an app over `MemoryDb` (behind a
//! switchable fault injector), a stub identity provider, and a tiny
//! cookie-keeping browser.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use secrets_core::domain::{AuthSession, Provider, User, UserCredentials};
use secrets_core::ports::{
    AuthorizationRequest, DatabaseService, IdentityProvider, PortError, PortResult,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use web_lib::adapters::MemoryDb;
use web_lib::config::Config;
use web_lib::web::{app, AppState};

pub const GOOD_CODE: &str = "good-code";

/// Answers every exchange of `GOOD_CODE` with a fixed subject id.
pub struct StubProvider {
    provider: Provider,
    subject: String,
    issued: AtomicUsize,
}

impl StubProvider {
    pub fn new(provider: Provider, subject: &str) -> Self {
        Self {
            provider,
            subject: subject.to_string(),
            issued: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn authorize_url(&self) -> AuthorizationRequest {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let csrf_state = format!("{}-state-{}", self.provider, n);
        AuthorizationRequest {
            url: format!(
                "https://idp.test/{}/authorize?state={}",
                self.provider, csrf_state
            ),
            csrf_state,
        }
    }

    async fn fetch_subject(&self, code: &str) -> PortResult<String> {
        if code == GOOD_CODE {
            Ok(self.subject.clone())
        } else {
            Err(PortError::Unexpected("invalid_grant".to_string()))
        }
    }
}

/// Switches shared between a test and its `FaultyDb`.
#[derive(Clone, Default)]
pub struct StoreFaults {
    unavailable: Arc<AtomicBool>,
    deletes_fail: Arc<AtomicBool>,
}

impl StoreFaults {
    /// Every store call fails with `PortError::Unavailable`.
    pub fn set_unavailable(&self, on: bool) {
        self.unavailable.store(on, Ordering::SeqCst);
    }

    /// Only `delete_auth_session` fails.
    pub fn set_deletes_fail(&self, on: bool) {
        self.deletes_fail.store(on, Ordering::SeqCst);
    }

    fn check(&self) -> PortResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

/// `MemoryDb` with failures injected through `StoreFaults`.
pub struct FaultyDb {
    inner: MemoryDb,
    faults: StoreFaults,
}

#[async_trait]
impl DatabaseService for FaultyDb {
    async fn create_local_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        self.faults.check()?;
        self.inner.create_local_user(username, hashed_password).await
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        self.faults.check()?;
        self.inner.get_credentials_by_username(username).await
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.faults.check()?;
        self.inner.get_user_by_id(user_id).await
    }

    async fn find_or_create_by_provider(
        &self,
        provider: Provider,
        subject_id: &str,
    ) -> PortResult<User> {
        self.faults.check()?;
        self.inner.find_or_create_by_provider(provider, subject_id).await
    }

    async fn update_secret(&self, user_id: Uuid, secret: &str) -> PortResult<()> {
        self.faults.check()?;
        self.inner.update_secret(user_id, secret).await
    }

    async fn list_users_with_secrets(&self) -> PortResult<Vec<User>> {
        self.faults.check()?;
        self.inner.list_users_with_secrets().await
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.faults.check()?;
        self.inner
            .create_auth_session(session_id, user_id, expires_at)
            .await
    }

    async fn get_auth_session(&self, session_id: &str) -> PortResult<AuthSession> {
        self.faults.check()?;
        self.inner.get_auth_session(session_id).await
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.faults.check()?;
        if self.faults.deletes_fail.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("delete timed out".to_string()));
        }
        self.inner.delete_auth_session(session_id).await
    }
}

pub struct TestApp {
    pub router: Router,
    /// The tables behind the app, readable even while faults are switched on.
    pub db: MemoryDb,
    pub faults: StoreFaults,
}

impl TestApp {
    /// Google is configured; Facebook is not.
    pub fn new() -> Self {
        let config = Config::from_lookup(|name| match name {
            "DATABASE_URL" => Some("memory://".to_string()),
            "SECRET" => Some("a-test-signing-secret-that-is-long-enough".to_string()),
            _ => None,
        })
        .expect("test config");

        let db = MemoryDb::new();
        let faults = StoreFaults::default();
        let store = FaultyDb {
            inner: db.clone(),
            faults: faults.clone(),
        };
        let providers: Vec<Arc<dyn IdentityProvider>> =
            vec![Arc::new(StubProvider::new(Provider::Google, "google-subject-1"))];
        let state = AppState::new(Arc::new(store), Arc::new(config), providers);

        Self {
            router: app(Arc::new(state)),
            db,
            faults,
        }
    }

    pub fn browser(&self) -> Browser {
        Browser {
            router: self.router.clone(),
            cookies: BTreeMap::new(),
        }
    }
}

/// Sends requests to the router and keeps cookies between them.
pub struct Browser {
    router: Router,
    pub cookies: BTreeMap<String, String>,
}

impl Browser {
    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        let request = Request::get(uri);
        self.send(request, Body::empty()).await
    }

    pub async fn post_form(&mut self, uri: &str, form: &str) -> Response<Body> {
        let request = Request::post(uri).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        self.send(request, Body::from(form.to_string())).await
    }

    /// Posts `body` with an arbitrary (or no) content type.
    pub async fn post_raw(
        &mut self,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> Response<Body> {
        let mut request = Request::post(uri);
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        self.send(request, Body::from(body.to_string())).await
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    async fn send(&mut self, mut request: axum::http::request::Builder, body: Body) -> Response<Body> {
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(header::COOKIE, cookie_header);
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let raw = set_cookie.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            if value.is_empty() {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }
        response
    }
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
}

/// Asserts a 303 to `target`.
pub fn assert_redirect(response: &Response<Body>, target: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response).as_deref(), Some(target));
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
