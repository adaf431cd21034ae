//! services/web/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use secrets_core::Provider;
use std::net::SocketAddr;
use tracing::Level;

/// Cookie signing keys are derived from `SECRET`, which needs at least this many bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Accepted range for `SESSION_TTL_DAYS`.
pub const SESSION_TTL_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=3650;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Client credentials for one OAuth provider.
#[derive(Clone, Debug)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub session_secret: String,
    pub public_url: String,
    pub session_ttl_days: i64,
    pub google: Option<OAuthCredentials>,
    pub facebook: Option<OAuthCredentials>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Session Settings ---
        let session_secret =
            var("SECRET").ok_or_else(|| ConfigError::MissingVar("SECRET".to_string()))?;
        if session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "SECRET".to_string(),
                format!("must be at least {} bytes long", MIN_SECRET_LEN),
            ));
        }

        let session_ttl_days = match var("SESSION_TTL_DAYS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|days| SESSION_TTL_DAYS_RANGE.contains(days))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "SESSION_TTL_DAYS".to_string(),
                        format!(
                            "'{}' is not a number of days between {} and {}",
                            raw,
                            SESSION_TTL_DAYS_RANGE.start(),
                            SESSION_TTL_DAYS_RANGE.end()
                        ),
                    )
                })?,
            None => 30,
        };

        let public_url = var("PUBLIC_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        // --- OAuth Providers (each optional) ---
        let google = oauth_pair(&var, "CLIENT_ID", "CLIENT_SECRET")?;
        let facebook = oauth_pair(&var, "FACEBOOK_ID", "FACEBOOK_SECRET")?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            session_secret,
            public_url,
            session_ttl_days,
            google,
            facebook,
        })
    }

    pub fn oauth_credentials(&self, provider: Provider) -> Option<&OAuthCredentials> {
        match provider {
            Provider::Google => self.google.as_ref(),
            Provider::Facebook => self.facebook.as_ref(),
        }
    }

    /// The absolute URL the provider redirects back to after consent.
    pub fn callback_url(&self, provider: Provider) -> String {
        format!("{}/auth/{}/secrets", self.public_url, provider)
    }
}

/// Both halves of a client credential pair must be set, or neither.
fn oauth_pair<F>(var: &F, id_var: &str, secret_var: &str) -> Result<Option<OAuthCredentials>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match (var(id_var), var(secret_var)) {
        (Some(client_id), Some(client_secret)) => Ok(Some(OAuthCredentials {
            client_id,
            client_secret,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::MissingVar(secret_var.to_string())),
        (None, Some(_)) => Err(ConfigError::MissingVar(id_var.to_string())),
    }
}
