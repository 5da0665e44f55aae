//! Work done once at startup and the periodic session sweep.

use std::sync::Arc;
use std::time::Duration;

use belay_core::error::BelayResult;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::state::{AppState, Auth};

/// Provision the platform superuser when one is configured.
pub async fn provision(state: &AppState, config: &ServerConfig) -> BelayResult<()> {
    if let Some(seed) = config.superuser.clone() {
        state.directory.ensure_superuser(seed).await?;
    }
    Ok(())
}

/// Delete expired sessions every `period` until the task is aborted.
/// A failed sweep is logged and retried on the next tick.
pub fn spawn_session_sweep(auth: Arc<Auth>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match auth.cleanup_expired().await {
                Ok(0) => debug!("No expired sessions"),
                Ok(removed) => info!(removed, "Expired sessions removed"),
                Err(e) => warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}
