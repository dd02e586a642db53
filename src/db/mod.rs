pub mod memory;
pub mod refresh_tokens;
pub mod users;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub use memory::{InMemoryRefreshTokenStore, InMemoryUserStore};
pub use refresh_tokens::{PgRefreshTokenStore, RefreshTokenStore};
pub use users::{PgUserStore, UserStore};

/// Failure reported by a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Converts Postgres unique violations into `Duplicate`.
    pub(crate) fn from_insert(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.constraint().unwrap_or("unique").to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded in ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
