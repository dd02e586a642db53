//! Delete expired refresh tokens.
//! Run periodically (e.g., via cron job: 0 3 * * * /app/purge-refresh-tokens)
//! when the in-process sweep is disabled.
//!
//! Usage: purge-refresh-tokens [--dry-run]
//!   --dry-run  : Only report how many tokens have expired

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use docvault_api::db::{PgRefreshTokenStore, RefreshTokenStore};
use docvault_api::services::cron::CronService;

#[derive(Parser)]
#[command(name = "purge-refresh-tokens", about = "Delete expired refresh tokens")]
struct Args {
    /// Count expired tokens without deleting them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let store = PgRefreshTokenStore::new(pool);

    if args.dry_run {
        let expired = store.count_expired(Utc::now()).await?;
        tracing::info!("{} expired refresh token(s) would be deleted", expired);
        return Ok(());
    }

    tracing::info!("Starting refresh token purge...");
    let removed = CronService::purge_expired_refresh_tokens(&store).await?;
    tracing::info!("Refresh token purge completed: {} removed", removed);

    Ok(())
}
