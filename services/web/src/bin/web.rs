//! services/web/src/bin/web.rs

use secrets_core::domain::Provider;
use secrets_core::ports::{DatabaseService, IdentityProvider};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use web_lib::{
    adapters::{DbAdapter, MemoryDb, OAuthProvider},
    config::Config,
    error::ApiError,
    web::{app, AppState},
};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the User Store & Run Migrations ---
    let db: Arc<dyn DatabaseService> = if config.database_url.starts_with("memory://") {
        warn!("Using the in-memory user store; all data is lost on shutdown.");
        Arc::new(MemoryDb::new())
    } else {
        info!("Connecting to database...");
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await?;
        let db_adapter = DbAdapter::new(db_pool);
        info!("Running database migrations...");
        db_adapter.run_migrations().await?;
        info!("Database migrations complete.");
        Arc::new(db_adapter)
    };

    // --- 3. Initialize Identity Providers ---
    let mut providers: Vec<Arc<dyn IdentityProvider>> = Vec::new();
    for provider in Provider::ALL {
        match config.oauth_credentials(provider) {
            Some(credentials) => {
                let adapter =
                    OAuthProvider::new(provider, credentials, config.callback_url(provider))
                        .map_err(|e| {
                            ApiError::Internal(format!("Invalid {} OAuth URL: {}", provider, e))
                        })?;
                providers.push(Arc::new(adapter));
                info!("{} login enabled.", provider);
            }
            None => warn!("{} login disabled: no client credentials configured.", provider),
        }
    }

    // --- 4. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState::new(db, config.clone(), providers));
    let router = app(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
