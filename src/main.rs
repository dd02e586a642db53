use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docvault_api::{
    config::Config,
    db::{self, PgRefreshTokenStore, PgUserStore, RefreshTokenStore},
    routes, services, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let users = Arc::new(PgUserStore::new(pool.clone()));
    let refresh_tokens: Arc<dyn RefreshTokenStore> = Arc::new(PgRefreshTokenStore::new(pool.clone()));

    if let Some(secs) = config.refresh_sweep_interval_secs {
        services::cron::start(refresh_tokens.clone(), secs);
        info!("Refresh token sweep every {}s", secs);
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::build(config, Some(pool), users, refresh_tokens).await?;
    info!("Upload directory: {}", state.files.root().display());

    let app = routes::create_router(state);

    info!("docvault API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
