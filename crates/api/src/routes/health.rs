//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub connections: usize,
    pub rooms: usize,
}

/// Health check endpoint
///
/// The vote database is only read on reveal, so it is not checked here.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.ws.get_stats().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: stats.active_connections,
        rooms: stats.active_rooms,
    })
}
