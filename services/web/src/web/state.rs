//! services/web/src/web/state.rs
//!
//! Defines the application state shared by every request, and the cookies
//! derived from it.

use crate::accounts::{CredentialVerifier, IdentityLinker, SessionManager};
use crate::config::Config;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use chrono::Duration;
use secrets_core::domain::Provider;
use secrets_core::ports::{DatabaseService, IdentityProvider};
use std::collections::HashMap;
use std::sync::Arc;

/// Holds the opaque login session id.
pub const SESSION_COOKIE: &str = "session";
/// Holds `{provider}:{csrf state}` during an OAuth round-trip.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub credentials: CredentialVerifier,
    pub identities: IdentityLinker,
    pub sessions: SessionManager,
    providers: HashMap<Provider, Arc<dyn IdentityProvider>>,
    cookie_key: Key,
}

impl AppState {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        config: Arc<Config>,
        providers: Vec<Arc<dyn IdentityProvider>>,
    ) -> Self {
        let ttl = Duration::days(config.session_ttl_days);
        Self {
            credentials: CredentialVerifier::new(db.clone()),
            identities: IdentityLinker::new(db.clone()),
            sessions: SessionManager::new(db.clone(), ttl),
            providers: providers.into_iter().map(|p| (p.provider(), p)).collect(),
            cookie_key: Key::derive_from(config.session_secret.as_bytes()),
            db,
            config,
        }
    }

    /// The configured adapter for `provider`, if its credentials were supplied.
    pub fn identity_provider(&self, provider: Provider) -> Option<&Arc<dyn IdentityProvider>> {
        self.providers.get(&provider)
    }

    /// Providers with credentials, in display order.
    pub fn enabled_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.providers.contains_key(p))
            .collect()
    }

    /// The request's cookies, verified against the signing key. Cookies with
    /// a bad signature are silently dropped.
    pub fn cookie_jar(&self, headers: &HeaderMap) -> SignedCookieJar {
        SignedCookieJar::from_headers(headers, self.cookie_key.clone())
    }

    pub fn session_cookie(&self, session_id: String) -> Cookie<'static> {
        self.cookie(SESSION_COOKIE, session_id)
    }

    pub fn oauth_state_cookie(&self, provider: Provider, csrf_state: &str) -> Cookie<'static> {
        self.cookie(OAUTH_STATE_COOKIE, format!("{}:{}", provider, csrf_state))
    }

    /// A cookie matching `name`'s path, for handing to `SignedCookieJar::remove`.
    pub fn removal_cookie(&self, name: &'static str) -> Cookie<'static> {
        Cookie::build(name).path("/").build()
    }

    // No Max-Age: these live for the browser session.
    fn cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.config.public_url.starts_with("https://"))
            .path("/")
            .build()
    }
}
