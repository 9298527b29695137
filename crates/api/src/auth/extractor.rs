//! Identity extraction for HTTP handlers
//!
//! Resolves the caller from either an `Authorization: Bearer <jwt>` header or
//! a `?token=<ephemeral>` query parameter. When both are present the ephemeral
//! token wins, since that is what a browser WebSocket handshake sends.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use poker_shared::Identity;
use serde::Deserialize;

use crate::{error::ApiError, state::AppState};

/// How the caller authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Bearer,
    Ephemeral,
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    pub method: AuthMethod,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ephemeral = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token)
            .filter(|t| !t.is_empty());

        if let Some(token) = ephemeral {
            let identity = state.tokens.redeem(&token).map_err(|e| {
                tracing::warn!(error = %e, "Ephemeral token rejected");
                ApiError::from(e)
            })?;
            return Ok(AuthUser {
                identity,
                method: AuthMethod::Ephemeral,
            });
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ApiError::Unauthorized)?
            .to_str()
            .map_err(|_| ApiError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let identity = state.jwt.validate_member_token(token).map_err(|e| {
            tracing::warn!(error = %e, "Bearer token rejected");
            ApiError::from(e)
        })?;

        Ok(AuthUser {
            identity,
            method: AuthMethod::Bearer,
        })
    }
}
