//! services/web/src/accounts/identity.rs
//!
//! Links OAuth subject ids to user records.

use secrets_core::domain::{Provider, User};
use secrets_core::ports::{AuthError, AuthResult, DatabaseService};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct IdentityLinker {
    db: Arc<dyn DatabaseService>,
}

impl IdentityLinker {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Returns the user already linked to `subject_id` at `provider`, or a new
    /// user carrying only that link. Atomicity is delegated to the store.
    pub async fn link(&self, provider: Provider, subject_id: &str) -> AuthResult<User> {
        if subject_id.is_empty() {
            return Err(AuthError::ProviderAuthFailure(format!(
                "{} returned an empty subject id",
                provider
            )));
        }

        let user = self
            .db
            .find_or_create_by_provider(provider, subject_id)
            .await
            .map_err(AuthError::from)?;
        debug!("{} subject linked to user {}", provider, user.id);
        Ok(user)
    }
}
