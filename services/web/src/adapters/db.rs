//! services/web/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrets_core::domain::{AuthSession, Provider, User, UserCredentials};
use secrets_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, google_id, facebook_id, secret, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Column holding the subject id of `provider`. Only ever interpolated from
/// this fixed set, never from request input.
fn provider_column(provider: Provider) -> &'static str {
    match provider {
        Provider::Google => "google_id",
        Provider::Facebook => "facebook_id",
    }
}

fn to_port_error(e: sqlx::Error, what: &str) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what.to_string()),
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            PortError::Conflict(format!("{}: {}", what, db.message()))
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PortError::Unavailable(e.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: Option<String>,
    google_id: Option<String>,
    facebook_id: Option<String>,
    secret: Option<String>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            google_id: self.google_id,
            facebook_id: self.facebook_id,
            secret: self.secret,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    username: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            username: self.username,
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    id: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}
impl AuthSessionRecord {
    fn to_domain(self) -> AuthSession {
        AuthSession {
            id: self.id,
            user_id: self.user_id,
            expires_at: self.expires_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_local_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        let query = format!(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| to_port_error(e, &format!("username {}", username)))?;
        Ok(record.to_domain())
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        // OAuth-only rows have no hash and are excluded.
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, password_hash FROM users \
             WHERE username = $1 AND password_hash IS NOT NULL",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| to_port_error(e, &format!("User {} not found", username)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| to_port_error(e, &format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn find_or_create_by_provider(
        &self,
        provider: Provider,
        subject_id: &str,
    ) -> PortResult<User> {
        let column = provider_column(provider);

        // The unique index on the provider column makes a racing insert a no-op.
        let insert = format!(
            "INSERT INTO users (id, {column}) VALUES ($1, $2) ON CONFLICT ({column}) DO NOTHING"
        );
        sqlx::query(&insert)
            .bind(Uuid::new_v4())
            .bind(subject_id)
            .execute(&self.pool)
            .await
            .map_err(|e| to_port_error(e, &format!("{} user {}", provider, subject_id)))?;

        let select = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let record = sqlx::query_as::<_, UserRecord>(&select)
            .bind(subject_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| to_port_error(e, &format!("{} user {} not found", provider, subject_id)))?;
        Ok(record.to_domain())
    }

    async fn update_secret(&self, user_id: Uuid, secret: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET secret = $1 WHERE id = $2")
            .bind(secret)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| to_port_error(e, &format!("User {}", user_id)))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn list_users_with_secrets(&self) -> PortResult<Vec<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE secret IS NOT NULL ORDER BY created_at ASC",
            USER_COLUMNS
        );
        let records = sqlx::query_as::<_, UserRecord>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| to_port_error(e, "users with secrets"))?;

        let users = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(users)
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| to_port_error(e, "auth session"))?;
        Ok(())
    }

    async fn get_auth_session(&self, session_id: &str) -> PortResult<AuthSession> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT id, user_id, expires_at FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "Auth session not found"))?;
        Ok(record.to_domain())
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| to_port_error(e, "auth session"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Run with `cargo test -- --ignored` and DATABASE_URL pointing at a
    // Postgres server that allows creating test databases.

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn concurrent_provider_links_insert_one_row(pool: PgPool) {
        let db = DbAdapter::new(pool.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move {
                    db.find_or_create_by_provider(Provider::Facebook, "fb-7").await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE facebook_id = $1")
            .bind("fb-7")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn duplicate_username_is_a_conflict(pool: PgPool) {
        let db = DbAdapter::new(pool);

        db.create_local_user("alice", "$argon2id$first").await.unwrap();
        let second = db.create_local_user("alice", "$argon2id$second").await;
        assert!(matches!(second, Err(PortError::Conflict(_))));

        let stored = db.get_credentials_by_username("alice").await.unwrap();
        assert_eq!(stored.hashed_password, "$argon2id$first");
    }
}
