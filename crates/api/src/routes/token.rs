//! Ephemeral token issuance
//!
//! Browsers cannot set headers on a WebSocket handshake, so the client first
//! trades its bearer token for a short-lived one and passes that as `?token=`.

use axum::{extract::State, http::header, response::IntoResponse};

use crate::{
    auth::{AuthMethod, AuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

/// GET /token
pub async fn issue_token(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    // An ephemeral token cannot be traded for another one
    if user.method != AuthMethod::Bearer {
        return Err(ApiError::Unauthorized);
    }

    let token = state.tokens.issue(&user.identity)?;

    tracing::debug!(
        user_id = %user.identity.user_id,
        room_id = %user.identity.room_id,
        "Issued ephemeral token"
    );

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], token))
}
