//! HTTP error type and its JSON rendering

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use poker_shared::PokerError;
use serde_json::json;

use crate::auth::{JwtError, TokenError};

/// Errors surfaced at the HTTP boundary
///
/// Socket-level failures never reach here; they end in deregistration.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No usable credential on the request
    #[error("No member identity on request")]
    Unauthorized,
    /// Bearer JWT failed verification, or the ephemeral token is unknown,
    /// already redeemed or past its lifetime
    #[error("Member token rejected")]
    InvalidToken,
    #[error("Member token has expired")]
    TokenExpired,

    /// Well-formed body that breaks a field rule
    #[error("{0}")]
    Validation(String),
    /// Body that is not the expected JSON at all
    #[error("{0}")]
    BadRequest(String),

    /// Vote lookup failed; the reveal is not broadcast
    #[error("Vote store unavailable: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            ApiError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        // Storage details stay in the logs
        let message = match &self {
            ApiError::Database(_) => "Could not load votes".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": { "code": code, "message": message } }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = ?err, "Vote store query failed");
        ApiError::Database(err.to_string())
    }
}

impl From<PokerError> for ApiError {
    fn from(err: PokerError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Encoding(msg) => {
                tracing::error!(error = %msg, "Failed to sign token");
                ApiError::Internal
            }
            JwtError::Expired => ApiError::TokenExpired,
            _ => ApiError::InvalidToken,
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NotFound => ApiError::InvalidToken,
            TokenError::Signing(inner) => inner.into(),
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
