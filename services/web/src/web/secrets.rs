//! services/web/src/web/secrets.rs
//!
//! The landing page, the public list of secrets, and secret submission.

use crate::web::auth::read_form;
use crate::web::middleware::CurrentUser;
use crate::web::pages;
use crate::web::state::AppState;
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    Extension, Form,
};
use secrets_core::domain::User;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SecretForm {
    pub secret: Option<String>,
}

/// GET / - Landing page
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Landing page", body = String, content_type = "text/html"))
)]
pub async fn home(Extension(current): Extension<CurrentUser>) -> Html<String> {
    Html(pages::home(current.is_authenticated()))
}

/// GET /secrets - Every submitted secret, visible to anyone
#[utoipa::path(
    get,
    path = "/secrets",
    responses(
        (status = 200, description = "List of secrets", body = String, content_type = "text/html"),
        (status = 503, description = "User store unavailable", body = String, content_type = "text/html")
    )
)]
pub async fn secrets_page(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> impl IntoResponse {
    match state.db.list_users_with_secrets().await {
        Ok(users) => {
            let secrets: Vec<String> = users.into_iter().filter_map(|u| u.secret).collect();
            (
                StatusCode::OK,
                Html(pages::secrets(&secrets, current.is_authenticated())),
            )
        }
        Err(e) => {
            error!("Failed to list secrets: {:?}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Html(pages::unavailable()))
        }
    }
}

/// GET /submit - Secret submission form (login required)
#[utoipa::path(
    get,
    path = "/submit",
    responses(
        (status = 200, description = "Submission form", body = String, content_type = "text/html"),
        (status = 303, description = "Not logged in; redirects to /login")
    )
)]
pub async fn submit_page(Extension(_user): Extension<User>) -> Html<String> {
    Html(pages::submit())
}

/// POST /submit - Replace the current user's secret (login required)
#[utoipa::path(
    post,
    path = "/submit",
    request_body(content = SecretForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved; redirects to /secrets. Redirects to /login when not logged in, or back to /submit on failure.")
    )
)]
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    form: Result<Form<SecretForm>, FormRejection>,
) -> Redirect {
    let Some(form) = read_form(form, "Secret submission") else {
        return Redirect::to("/submit");
    };
    let Some(secret) = form.secret else {
        return Redirect::to("/submit");
    };

    match state.db.update_secret(user.id, &secret).await {
        Ok(()) => {
            info!("User {} updated their secret", user.id);
            Redirect::to("/secrets")
        }
        Err(e) => {
            error!("Failed to save secret for user {}: {:?}", user.id, e);
            Redirect::to("/submit")
        }
    }
}
