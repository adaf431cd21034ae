//! services/web/src/web/auth.rs
//!
//! Authentication endpoints: local registration and login, the Google and
//! Facebook OAuth round-trips, and logout.
//!
//! Every failure ends in a redirect back to the form the user came from; the
//! cause is only logged.

use crate::web::pages;
use crate::web::state::{AppState, OAUTH_STATE_COOKIE, SESSION_COOKIE};
use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    http::HeaderMap,
    response::{Html, Redirect},
    Form,
};
use axum_extra::extract::cookie::SignedCookieJar;
use secrets_core::domain::{Provider, User};
use secrets_core::ports::{AuthError, AuthResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

//=========================================================================================
// Request Types
//=========================================================================================

/// Missing fields deserialize as empty strings and are rejected by the verifier.
#[derive(Deserialize, ToSchema)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OAuthCallback {
    /// Authorization code, present on success.
    pub code: Option<String>,
    /// CSRF state echoed back by the provider.
    pub state: Option<String>,
    /// Set by the provider when the user denied consent or the flow failed.
    pub error: Option<String>,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Logs an account failure at a level matching its cause.
fn log_failure(context: &str, e: &AuthError) {
    match e {
        AuthError::StoreUnavailable(_) | AuthError::Unexpected(_) => {
            error!("{} failed: {}", context, e)
        }
        _ => warn!("{} rejected: {}", context, e),
    }
}

/// Establishes a session for `user` and adds its cookie to `jar`.
async fn start_session(
    state: &AppState,
    jar: SignedCookieJar,
    user: &User,
) -> AuthResult<SignedCookieJar> {
    let previous = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let session_id = state.sessions.establish(user, previous.as_deref()).await?;
    Ok(jar.add(state.session_cookie(session_id)))
}

/// Unwraps a submitted form, logging why it could not be read.
pub(crate) fn read_form<T>(form: Result<Form<T>, FormRejection>, context: &str) -> Option<T> {
    match form {
        Ok(Form(form)) => Some(form),
        Err(rejection) => {
            warn!("{} rejected: unreadable form: {}", context, rejection);
            None
        }
    }
}

/// Only the two known providers route anywhere; anything else is a miss.
fn parse_provider(name: &str) -> AuthResult<Provider> {
    name.parse::<Provider>()
        .map_err(AuthError::ProviderAuthFailure)
}

//=========================================================================================
// Local Accounts
//=========================================================================================

/// GET /register - Registration form
#[utoipa::path(
    get,
    path = "/register",
    responses((status = 200, description = "Registration form", body = String, content_type = "text/html"))
)]
pub async fn register_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::register(&state.enabled_providers()))
}

/// POST /register - Create a local account and log it in
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = CredentialsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered and logged in; redirects to /secrets. On failure redirects to /register.")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Result<(SignedCookieJar, Redirect), Redirect> {
    let Some(form) = read_form(form, "Registration") else {
        return Err(Redirect::to("/register"));
    };

    let result = async {
        let user = state
            .credentials
            .register(&form.username, &form.password)
            .await?;
        start_session(&state, state.cookie_jar(&headers), &user).await
    }
    .await;

    match result {
        Ok(jar) => Ok((jar, Redirect::to("/secrets"))),
        Err(e) => {
            log_failure("Registration", &e);
            Err(Redirect::to("/register"))
        }
    }
}

/// GET /login - Login form
#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login form", body = String, content_type = "text/html"))
)]
pub async fn login_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::login(&state.enabled_providers()))
}

/// POST /login - Login with a local account
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = CredentialsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in; redirects to /secrets. On failure redirects to /login.")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Result<(SignedCookieJar, Redirect), Redirect> {
    let Some(form) = read_form(form, "Login") else {
        return Err(Redirect::to("/login"));
    };

    let result = async {
        let user = state
            .credentials
            .verify(&form.username, &form.password)
            .await?;
        start_session(&state, state.cookie_jar(&headers), &user).await
    }
    .await;

    match result {
        Ok(jar) => Ok((jar, Redirect::to("/secrets"))),
        Err(e) => {
            log_failure("Login", &e);
            Err(Redirect::to("/login"))
        }
    }
}

//=========================================================================================
// OAuth
//=========================================================================================

/// GET /auth/{provider} - Redirect to the provider's consent screen
#[utoipa::path(
    get,
    path = "/auth/{provider}",
    params(("provider" = String, Path, description = "`google` or `facebook`")),
    responses(
        (status = 303, description = "Redirects to the provider, or to /login if the provider is not configured.")
    )
)]
pub async fn oauth_start(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Result<(SignedCookieJar, Redirect), Redirect> {
    let provider = parse_provider(&provider).map_err(|e| {
        log_failure("OAuth start", &e);
        Redirect::to("/login")
    })?;
    let Some(identity_provider) = state.identity_provider(provider) else {
        warn!("OAuth login with {} requested, but it is not configured", provider);
        return Err(Redirect::to("/login"));
    };

    let request = identity_provider.authorize_url();
    let jar = state
        .cookie_jar(&headers)
        .add(state.oauth_state_cookie(provider, &request.csrf_state));
    Ok((jar, Redirect::to(&request.url)))
}

/// Validates the callback and returns the linked user.
async fn complete_oauth(
    state: &AppState,
    provider: Provider,
    params: OAuthCallback,
    expected_state: Option<&str>,
) -> AuthResult<User> {
    let identity_provider = state.identity_provider(provider).ok_or_else(|| {
        AuthError::ProviderAuthFailure(format!("{} is not configured", provider))
    })?;

    // 1. The provider reported an error (e.g. consent denied)
    if let Some(error) = params.error {
        return Err(AuthError::ProviderAuthFailure(format!("{}: {}", provider, error)));
    }

    // 2. The state must match the one set when the round-trip started
    let returned_state = params.state.map(|s| format!("{}:{}", provider, s));
    if returned_state.is_none() || returned_state.as_deref() != expected_state {
        return Err(AuthError::ProviderAuthFailure(format!("{}: state mismatch", provider)));
    }

    // 3. Exchange the code for the subject id
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::ProviderAuthFailure(format!("{}: missing code", provider)))?;
    let subject_id = identity_provider
        .fetch_subject(&code)
        .await
        .map_err(|e| AuthError::ProviderAuthFailure(e.to_string()))?;

    // 4. Find or create the user
    state.identities.link(provider, &subject_id).await
}

/// GET /auth/{provider}/secrets - OAuth callback
#[utoipa::path(
    get,
    path = "/auth/{provider}/secrets",
    params(
        ("provider" = String, Path, description = "`google` or `facebook`"),
        OAuthCallback
    ),
    responses(
        (status = 303, description = "Logged in; redirects to /secrets. On any provider failure redirects to /login.")
    )
)]
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Query(params): Query<OAuthCallback>,
) -> (SignedCookieJar, Redirect) {
    // The state cookie is single-use.
    let jar = state.cookie_jar(&headers);
    let expected_state = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(state.removal_cookie(OAUTH_STATE_COOKIE));

    let result = async {
        let provider = parse_provider(&provider)?;
        let user = complete_oauth(&state, provider, params, expected_state.as_deref()).await?;
        info!("User {} logged in with {}", user.id, provider);
        start_session(&state, jar.clone(), &user).await
    }
    .await;

    match result {
        Ok(jar) => (jar, Redirect::to("/secrets")),
        Err(e) => {
            log_failure("OAuth callback", &e);
            (jar, Redirect::to("/login"))
        }
    }
}

//=========================================================================================
// Logout
//=========================================================================================

/// GET /logout - Destroy the session and return home
#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Session destroyed; redirects to /"))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (SignedCookieJar, Redirect) {
    let jar = state.cookie_jar(&headers);

    // The cookie is cleared even if the record could not be deleted.
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = state.sessions.destroy(cookie.value()).await {
            error!("Failed to destroy session on logout: {}", e);
        }
    }

    (jar.remove(state.removal_cookie(SESSION_COOKIE)), Redirect::to("/"))
}
