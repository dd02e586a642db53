// Library exports for binary tools and tests
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use sqlx::PgPool;

use config::Config;
use db::{RefreshTokenStore, UserStore};
use services::{
    auth::AuthService,
    credentials::CredentialVerifier,
    encryption::PathCipher,
    file_storage::SecureFileStore,
    tokens::{TokenIssuer, TokenSettings},
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// `None` when running on in-memory stores.
    pub db: Option<PgPool>,
    pub config: Arc<Config>,
    pub auth: AuthService,
    pub tokens: Arc<TokenIssuer>,
    pub files: Arc<SecureFileStore>,
}

impl AppState {
    /// Wire the services from explicit configuration and store backends.
    pub async fn build(
        config: Config,
        db: Option<PgPool>,
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> anyhow::Result<Self> {
        let cipher = PathCipher::new(&config.encryption_secret)?;
        let files = SecureFileStore::open(&config.upload_dir, cipher).await?;

        let credentials = Arc::new(CredentialVerifier::new(users, config.bcrypt_cost));
        let tokens = Arc::new(TokenIssuer::new(
            &TokenSettings::from_config(&config),
            refresh_tokens,
            credentials.clone(),
        ));
        let auth = AuthService::new(credentials, tokens.clone());

        Ok(Self {
            db,
            config: Arc::new(config),
            auth,
            tokens,
            files: Arc::new(files),
        })
    }
}
