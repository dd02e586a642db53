//! Periodic removal of expired refresh tokens.
//!
//! Expired tokens are already dropped lazily when presented; the sweep only
//! keeps abandoned sessions from piling up.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::db::{RefreshTokenStore, StoreError};

pub struct CronService;

impl CronService {
    /// Delete every refresh token that has expired by now.
    pub async fn purge_expired_refresh_tokens(
        store: &dyn RefreshTokenStore,
    ) -> Result<u64, StoreError> {
        let removed = store.delete_expired(Utc::now()).await?;
        if removed > 0 {
            info!("Purged {} expired refresh token(s)", removed);
        }
        Ok(removed)
    }
}

/// Spawn the background sweep.
pub fn start(store: Arc<dyn RefreshTokenStore>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            if let Err(e) = CronService::purge_expired_refresh_tokens(store.as_ref()).await {
                warn!("Refresh token sweep failed: {}", e);
            }
        }
    });
}
