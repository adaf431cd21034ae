//! services/web/src/web/middleware.rs
//!
//! Session resolution and route protection.

use crate::web::state::{AppState, SESSION_COOKIE};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use secrets_core::domain::User;
use secrets_core::ports::AuthError;
use std::sync::Arc;
use tracing::{error, warn};

/// The identity resolved for the current request; `None` when anonymous.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

/// Middleware that restores the logged-in user from the session cookie.
///
/// Always inserts a `CurrentUser` into the request extensions. Any failure
/// to resolve the session leaves the request anonymous instead of failing it.
pub async fn resolve_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Extract the signed session cookie
    let jar = state.cookie_jar(req.headers());
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    // 2. Look up the session and its user
    let user = match session_id {
        Some(session_id) => match state.sessions.resolve(&session_id).await {
            Ok(user) => user,
            Err(e @ AuthError::SessionUserNotFound(_)) => {
                warn!("Ignoring session: {}", e);
                None
            }
            Err(e) => {
                error!("Failed to resolve session: {}", e);
                None
            }
        },
        None => None,
    };

    // 3. Insert the identity into request extensions
    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}

/// Middleware for routes that need a logged-in user.
///
/// Anonymous requests are redirected to `/login`; otherwise the `User` is
/// inserted into the request extensions for handlers to use.
pub async fn require_auth(mut req: Request, next: Next) -> Response {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .and_then(|current| current.0.clone());

    match user {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => Redirect::to("/login").into_response(),
    }
}
