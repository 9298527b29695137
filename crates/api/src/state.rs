//! Application state shared across handlers

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{
    auth::{EphemeralTokenStore, JwtManager},
    config::Config,
    websocket::{Dispatcher, WebSocketState},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub jwt: JwtManager,
    pub tokens: Arc<EphemeralTokenStore>,
    pub ws: WebSocketState,
}

impl AppState {
    /// Build the state and the event dispatcher the caller must spawn
    pub fn new(config: Config, pool: SqlitePool) -> (Self, Dispatcher) {
        let jwt = JwtManager::new(&config.auth_secret);
        let tokens = Arc::new(EphemeralTokenStore::with_ttl(
            jwt.clone(),
            config.ephemeral_token_ttl(),
        ));
        let (ws, dispatcher) = WebSocketState::new(config.dispatch_queue_capacity);

        let state = Self {
            config: Arc::new(config),
            pool,
            jwt,
            tokens,
            ws,
        };

        (state, dispatcher)
    }
}
