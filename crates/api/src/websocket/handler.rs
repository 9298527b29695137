//! WebSocket handler for Axum
//!
//! Authenticates the upgrade request and hands the socket to the registry.

use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    response::Response,
};
use futures::StreamExt;
use poker_shared::Identity;

use crate::auth::AuthUser;
use crate::state::AppState;

/// WebSocket handler - upgrades HTTP connection to WebSocket
///
/// Accepts a bearer JWT or a single-use `?token=` from `/token`. Identity is
/// resolved before the upgrade, so an unauthenticated socket is never
/// registered.
pub async fn ws_handler(
    State(app_state): State<AppState>,
    user: AuthUser,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::info!(
        user_id = %user.identity.user_id,
        room_id = %user.identity.room_id,
        method = ?user.method,
        "WebSocket connection upgrade requested"
    );

    ws.on_upgrade(move |socket| handle_socket(socket, user.identity, app_state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, identity: Identity, app_state: AppState) {
    let (sink, frames) = socket.split();

    app_state
        .ws
        .register_authenticated_connection(&identity, sink, frames)
        .await;
}
