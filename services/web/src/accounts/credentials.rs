//! services/web/src/accounts/credentials.rs
//!
//! Local username/password accounts, hashed with Argon2.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use secrets_core::domain::User;
use secrets_core::ports::{AuthError, AuthResult, DatabaseService, PortError};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct CredentialVerifier {
    db: Arc<dyn DatabaseService>,
}

impl CredentialVerifier {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Creates a local account. The store's unique index on `username`
    /// decides races between two registrations of the same name.
    pub async fn register(&self, username: &str, password: &str) -> AuthResult<User> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        // 1. Hash the password with a fresh salt
        let password_hash = hash_password(password)?;

        // 2. Create the user
        let user = self
            .db
            .create_local_user(username, &password_hash)
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => AuthError::UsernameTaken(username.to_string()),
                other => AuthError::from(other),
            })?;

        info!("Registered local user {}", user.id);
        Ok(user)
    }

    /// Checks a username/password pair and returns the matching user.
    pub async fn verify(&self, username: &str, password: &str) -> AuthResult<User> {
        // 1. Get the stored credentials
        let creds = self
            .db
            .get_credentials_by_username(username)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => AuthError::InvalidCredentials,
                other => AuthError::from(other),
            })?;

        // 2. Verify the password
        let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
            error!("Failed to parse password hash for user {}: {:?}", creds.user_id, e);
            AuthError::Unexpected("stored password hash is malformed".to_string())
        })?;

        let valid = Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        // 3. Load the full user record
        self.db
            .get_user_by_id(creds.user_id)
            .await
            .map_err(AuthError::from)
    }
}

fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            AuthError::Unexpected("failed to hash password".to_string())
        })
}
