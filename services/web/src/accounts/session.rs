//! services/web/src/accounts/session.rs
//!
//! Server-side login sessions. The browser only ever holds the opaque session
//! id; the record behind it stores the serialized user reference (the user id).

use chrono::{Duration, Utc};
use secrets_core::domain::User;
use secrets_core::ports::{AuthError, AuthResult, DatabaseService, PortError};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// What a session persists about its user.
pub type SessionPayload = Uuid;

#[derive(Clone)]
pub struct SessionManager {
    db: Arc<dyn DatabaseService>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(db: Arc<dyn DatabaseService>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Reduces a user to the reference stored in the session record.
    pub fn serialize(user: &User) -> SessionPayload {
        user.id
    }

    /// Looks the user back up from a session payload.
    pub async fn deserialize(&self, payload: SessionPayload) -> AuthResult<User> {
        self.db.get_user_by_id(payload).await.map_err(|e| match e {
            PortError::NotFound(_) => AuthError::SessionUserNotFound(payload),
            other => AuthError::from(other),
        })
    }

    /// Starts a session for `user` and returns its id. A session the browser
    /// already held is destroyed first, so ids are never reused across logins.
    pub async fn establish(&self, user: &User, previous: Option<&str>) -> AuthResult<String> {
        if let Some(previous) = previous {
            if let Err(e) = self.destroy(previous).await {
                warn!("Failed to destroy previous session: {}", e);
            }
        }

        // 1. Generate auth session ID
        let session_id = Uuid::new_v4().to_string();

        // 2. Set expiration
        let expires_at = Utc::now().checked_add_signed(self.ttl).ok_or_else(|| {
            AuthError::Unexpected(format!("session lifetime {} overflows the clock", self.ttl))
        })?;

        // 3. Create auth session in database
        self.db
            .create_auth_session(&session_id, Self::serialize(user), expires_at)
            .await
            .map_err(AuthError::from)?;

        debug!("Session established for user {}", user.id);
        Ok(session_id)
    }

    /// Restores the user behind a session id. Unknown and expired sessions
    /// resolve to `None`; expired records are removed on the way.
    pub async fn resolve(&self, session_id: &str) -> AuthResult<Option<User>> {
        let session = match self.db.get_auth_session(session_id).await {
            Ok(session) => session,
            Err(PortError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(AuthError::from(e)),
        };

        if session.is_expired() {
            debug!("Session for user {} expired", session.user_id);
            self.destroy(session_id).await?;
            return Ok(None);
        }

        self.deserialize(session.user_id).await.map(Some)
    }

    pub async fn destroy(&self, session_id: &str) -> AuthResult<()> {
        self.db
            .delete_auth_session(session_id)
            .await
            .map_err(AuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryDb;

    fn manager(db: &MemoryDb) -> SessionManager {
        SessionManager::new(Arc::new(db.clone()), Duration::days(30))
    }

    #[tokio::test]
    async fn establish_and_resolve() {
        let db = MemoryDb::new();
        let sessions = manager(&db);
        let user = db.create_local_user("alice", "h").await.unwrap();

        let sid = sessions.establish(&user, None).await.unwrap();
        let resolved = sessions.resolve(&sid).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn destroyed_session_no_longer_resolves() {
        let db = MemoryDb::new();
        let sessions = manager(&db);
        let user = db.create_local_user("alice", "h").await.unwrap();

        let sid = sessions.establish(&user, None).await.unwrap();
        sessions.destroy(&sid).await.unwrap();
        assert!(sessions.resolve(&sid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_session_resolves_to_none() {
        let db = MemoryDb::new();
        assert!(manager(&db).resolve("not-a-session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_is_removed() {
        let db = MemoryDb::new();
        let user = db.create_local_user("alice", "h").await.unwrap();
        db.create_auth_session("old", user.id, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        assert!(manager(&db).resolve("old").await.unwrap().is_none());
        assert_eq!(db.session_count().await, 0);
    }

    #[tokio::test]
    async fn re_login_replaces_previous_session() {
        let db = MemoryDb::new();
        let sessions = manager(&db);
        let user = db.create_local_user("alice", "h").await.unwrap();

        let first = sessions.establish(&user, None).await.unwrap();
        let second = sessions.establish(&user, Some(&first)).await.unwrap();
        assert_ne!(first, second);
        assert!(sessions.resolve(&first).await.unwrap().is_none());
        assert!(sessions.resolve(&second).await.unwrap().is_some());
        assert_eq!(db.session_count().await, 1);
    }

    #[tokio::test]
    async fn unrepresentable_expiry_is_an_error() {
        let db = MemoryDb::new();
        let user = db.create_local_user("alice", "h").await.unwrap();
        let sessions = SessionManager::new(Arc::new(db.clone()), Duration::days(100_000_000));

        assert!(matches!(
            sessions.establish(&user, None).await,
            Err(AuthError::Unexpected(_))
        ));
        assert_eq!(db.session_count().await, 0);
    }

    #[tokio::test]
    async fn missing_user_fails_deserialization() {
        let db = MemoryDb::new();
        let sessions = manager(&db);
        let ghost = Uuid::new_v4();
        db.create_auth_session("sid", ghost, Utc::now() + Duration::days(1))
            .await
            .unwrap();

        assert!(matches!(
            sessions.resolve("sid").await,
            Err(AuthError::SessionUserNotFound(id)) if id == ghost
        ));
    }
}
