//! Single-use, short-lived tokens for the WebSocket handshake
//!
//! Browsers cannot attach an `Authorization` header when opening a WebSocket,
//! so an authenticated client first trades its bearer token for an ephemeral
//! one and passes that in the `?token=` query parameter instead.

use poker_shared::Identity;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::jwt::{JwtError, JwtManager};

/// Default token lifetime: long enough for a page navigation
pub const DEFAULT_EPHEMERAL_TTL: Duration = Duration::from_secs(3);

/// Stored token entry
struct TokenEntry {
    identity: Identity,
    jti: String,
    issued_at: Instant,
    expires_at: Instant,
}

impl TokenEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory store of issued, not yet redeemed tokens
pub struct EphemeralTokenStore {
    jwt: JwtManager,
    tokens: Mutex<HashMap<String, TokenEntry>>,
    ttl: Duration,
}

impl EphemeralTokenStore {
    /// Create a store with the default TTL
    pub fn new(jwt: JwtManager) -> Self {
        Self::with_ttl(jwt, DEFAULT_EPHEMERAL_TTL)
    }

    /// Create a store with a custom TTL
    pub fn with_ttl(jwt: JwtManager, ttl: Duration) -> Self {
        Self {
            jwt,
            tokens: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenEntry>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Issue a token for `identity`, redeemable once within the TTL
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        let (token, jti) = self
            .jwt
            .generate_ephemeral_token(identity, self.ttl)
            .map_err(TokenError::Signing)?;

        let issued_at = Instant::now();
        let entry = TokenEntry {
            identity: identity.clone(),
            jti,
            issued_at,
            expires_at: issued_at + self.ttl,
        };

        let outstanding = {
            let mut tokens = self.lock();
            tokens.insert(token.clone(), entry);
            tokens.len()
        };

        tracing::debug!(
            user_id = %identity.user_id,
            room_id = %identity.room_id,
            ttl_ms = self.ttl.as_millis() as u64,
            outstanding,
            "Ephemeral token issued"
        );

        Ok(token)
    }

    /// Redeem a token, consuming it
    ///
    /// Lookup and removal happen under one lock, so of two concurrent
    /// redemptions of the same token exactly one succeeds.
    pub fn redeem(&self, token: &str) -> Result<Identity, TokenError> {
        let entry = self.lock().remove(token).ok_or(TokenError::NotFound)?;

        let now = Instant::now();
        if entry.is_expired(now) {
            tracing::warn!(
                user_id = %entry.identity.user_id,
                jti = %entry.jti,
                age_ms = now.duration_since(entry.issued_at).as_millis() as u64,
                "Attempted to redeem expired ephemeral token"
            );
            return Err(TokenError::NotFound);
        }

        tracing::debug!(
            user_id = %entry.identity.user_id,
            room_id = %entry.identity.room_id,
            jti = %entry.jti,
            "Ephemeral token redeemed"
        );

        Ok(entry.identity)
    }

    /// Drop every expired token, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut tokens = self.lock();
        let before = tokens.len();
        tokens.retain(|_, entry| !entry.is_expired(now));
        let purged = before - tokens.len();

        if purged > 0 {
            tracing::debug!(count = purged, "Purged expired ephemeral tokens");
        }

        purged
    }

    /// Number of tokens issued but not yet redeemed or purged
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run [`EphemeralTokenStore::purge_expired`] on a fixed interval
///
/// One task for the whole store, regardless of how many tokens are issued.
pub fn spawn_token_sweeper(store: Arc<EphemeralTokenStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            store.purge_expired();
        }
    })
}

/// Token redemption errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Never issued, already redeemed, or expired
    #[error("Token not found")]
    NotFound,
    #[error("Failed to sign token: {0}")]
    Signing(#[source] JwtError),
}
