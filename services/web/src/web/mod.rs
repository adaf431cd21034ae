pub mod auth;
pub mod middleware;
pub mod pages;
pub mod secrets;
pub mod state;

pub use middleware::{require_auth, resolve_session, CurrentUser};
pub use state::AppState;

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        secrets::home,
        auth::register_page,
        auth::register_handler,
        auth::login_page,
        auth::login_handler,
        auth::oauth_start,
        auth::oauth_callback,
        secrets::secrets_page,
        secrets::submit_page,
        secrets::submit_handler,
        auth::logout_handler,
    ),
    components(
        schemas(auth::CredentialsForm, secrets::SecretForm)
    ),
    tags(
        (name = "Secrets", description = "Server-rendered pages and form endpoints of the secrets site.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds the complete application router around `state`.
pub fn app(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(secrets::home))
        .route("/register", get(auth::register_page).post(auth::register_handler))
        .route("/login", get(auth::login_page).post(auth::login_handler))
        .route("/auth/{provider}", get(auth::oauth_start))
        .route("/auth/{provider}/secrets", get(auth::oauth_callback))
        .route("/secrets", get(secrets::secrets_page))
        .route("/logout", get(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/submit", get(secrets::submit_page).post(secrets::submit_handler))
        .route_layer(axum_middleware::from_fn(require_auth));

    // Session resolution wraps both, so it runs before `require_auth`.
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            resolve_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
