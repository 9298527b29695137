use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use poker_api::{auth::spawn_token_sweeper, create_router, websocket::WebSocketState, AppState, Config};
use poker_shared::create_pool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("poker_api=info,tower_http=info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Poker live server v{} starting", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to open vote database")?;

    let bind_address = config.bind_address.clone();
    let sweep_interval = config.token_sweep_interval();
    let drain_timeout = config.shutdown_drain_timeout();
    let (state, dispatcher) = AppState::new(config, pool);

    dispatcher.spawn();
    spawn_token_sweeper(state.tokens.clone(), sweep_interval);

    let ws = state.ws.clone();
    let app = create_router(state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    tracing::info!(address = %bind_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(ws.clone()))
        .await
        .context("Server error")?;

    // Upgraded sockets are not tracked by the server's graceful shutdown
    ws.drain(drain_timeout).await;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for ctrl-c, then ask every live socket to close
async fn shutdown_signal(ws: WebSocketState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
    ws.close_all().await;
}
