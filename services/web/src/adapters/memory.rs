//! services/web/src/adapters/memory.rs
//!
//! A process-local implementation of the `DatabaseService` port. Selected with
//! `DATABASE_URL=memory://` for development, and used by the test suites.
//! Everything is lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrets_core::domain::{AuthSession, Provider, User, UserCredentials};
use secrets_core::ports::{DatabaseService, PortError, PortResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    /// Insertion order doubles as creation order.
    users: Vec<User>,
    password_hashes: HashMap<Uuid, String>,
    auth_sessions: HashMap<String, AuthSession>,
}

impl Tables {
    fn user_mut(&mut self, user_id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == user_id)
    }
}

fn new_user() -> User {
    User {
        id: Uuid::new_v4(),
        username: None,
        google_id: None,
        facebook_id: None,
        secret: None,
        created_at: Utc::now(),
    }
}

/// In-memory user and session store. Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    pub async fn session_count(&self) -> usize {
        self.tables.read().await.auth_sessions.len()
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_local_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.username.as_deref() == Some(username))
        {
            return Err(PortError::Conflict(format!("username {}", username)));
        }

        let user = User {
            username: Some(username.to_string()),
            ..new_user()
        };
        tables
            .password_hashes
            .insert(user.id, hashed_password.to_string());
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
            .and_then(|u| {
                tables.password_hashes.get(&u.id).map(|hash| UserCredentials {
                    user_id: u.id,
                    username: username.to_string(),
                    hashed_password: hash.clone(),
                })
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn find_or_create_by_provider(
        &self,
        provider: Provider,
        subject_id: &str,
    ) -> PortResult<User> {
        // Lookup and insert happen under one write guard.
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .users
            .iter()
            .find(|u| u.provider_id(provider) == Some(subject_id))
        {
            return Ok(existing.clone());
        }

        let mut user = new_user();
        match provider {
            Provider::Google => user.google_id = Some(subject_id.to_string()),
            Provider::Facebook => user.facebook_id = Some(subject_id.to_string()),
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_secret(&self, user_id: Uuid, secret: &str) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .user_mut(user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        user.secret = Some(secret.to_string());
        Ok(())
    }

    async fn list_users_with_secrets(&self) -> PortResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| u.secret.is_some())
            .cloned()
            .collect())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if tables.auth_sessions.contains_key(session_id) {
            return Err(PortError::Conflict("auth session".to_string()));
        }
        tables.auth_sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn get_auth_session(&self, session_id: &str) -> PortResult<AuthSession> {
        let tables = self.tables.read().await;
        tables
            .auth_sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Auth session not found".to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.auth_sessions.remove(session_id);
        Ok(())
    }
}
