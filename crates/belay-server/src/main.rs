//! Belay Server: application entry point.

use belay_db::DbManager;
use belay_server::startup::{provision, spawn_session_sweep};
use belay_server::{AppState, ServerConfig, router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("belay=info".parse()?))
        .json()
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(bind_addr = %config.bind_addr, "Starting Belay server...");

    let db = DbManager::connect(&config.db).await?;
    let state = AppState::new(db.client().clone(), config.auth.clone(), config.cookie_secure);
    provision(&state, &config).await?;
    let sweep = spawn_session_sweep(state.auth.clone(), config.session_sweep_interval);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    sweep.abort();
    tracing::info!("Belay server stopped.");
    Ok(())
}
