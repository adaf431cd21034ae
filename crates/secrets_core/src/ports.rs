//! crates/secrets_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or
//! OAuth providers.

use crate::domain::{AuthSession, Provider, User, UserCredentials};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Authentication Errors
//=========================================================================================

/// Failures of the account operations (registration, login, OAuth linking, sessions).
///
/// None of these are fatal; the route layer turns every one of them into a redirect.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),
    #[error("Username and password are both required")]
    MissingCredentials,
    #[error("Session refers to user {0}, which no longer exists")]
    SessionUserNotFound(Uuid),
    #[error("Identity provider authentication failed: {0}")]
    ProviderAuthFailure(String),
    #[error("User store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<PortError> for AuthError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
            other => AuthError::Unexpected(other.to_string()),
        }
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Local Accounts ---

    /// Creates a local account. Fails with `PortError::Conflict` when the
    /// username is already in use; no record is written in that case.
    async fn create_local_user(&self, username: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    // --- Users ---

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    /// Returns the user linked to `subject_id` for `provider`, creating it if
    /// absent. Must be atomic: concurrent calls for the same pair return the
    /// same record.
    async fn find_or_create_by_provider(
        &self,
        provider: Provider,
        subject_id: &str,
    ) -> PortResult<User>;

    /// Overwrites the user's secret.
    async fn update_secret(&self, user_id: Uuid, secret: &str) -> PortResult<()>;

    /// Every user whose secret is present, oldest account first.
    async fn list_users_with_secrets(&self) -> PortResult<Vec<User>>;

    // --- Auth Sessions ---

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn get_auth_session(&self, session_id: &str) -> PortResult<AuthSession>;

    /// Deleting an unknown session is not an error.
    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

/// The redirect that starts an OAuth round-trip.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    /// Must come back unchanged in the callback's `state` parameter.
    pub csrf_state: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// Builds the consent-screen URL together with a fresh CSRF state.
    fn authorize_url(&self) -> AuthorizationRequest;

    /// Exchanges an authorization code for the provider's stable subject id.
    async fn fetch_subject(&self, code: &str) -> PortResult<String>;
}
