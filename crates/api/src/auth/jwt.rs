//! JWT token generation and validation

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use poker_shared::Identity;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// JWT claims issued by the web app when a member joins a room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberClaims {
    /// Member ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Room the member belongs to
    pub room_id: String,
    /// Issued at (the web app does not always set it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiration (member tokens are long-lived and often carry none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Only set on tokens this server signs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenType>,
    /// JWT ID, unique per ephemeral token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl From<MemberClaims> for Identity {
    fn from(claims: MemberClaims) -> Self {
        Identity {
            user_id: claims.id,
            name: claims.name,
            room_id: claims.room_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Member,
    Ephemeral,
}

/// JWT manager for token operations
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// Create a new JWT manager from the secret shared with the web app
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a long-lived member token, the way the web app does on join
    pub fn generate_member_token(
        &self,
        identity: &Identity,
        expires_in: Option<Duration>,
    ) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let claims = MemberClaims {
            id: identity.user_id.clone(),
            name: identity.name.clone(),
            room_id: identity.room_id.clone(),
            iat: Some(now.unix_timestamp()),
            exp: expires_in.map(|ttl| (now + ttl).unix_timestamp()),
            token_type: Some(TokenType::Member),
            jti: None,
        };

        self.sign(&claims)
    }

    /// Sign a short-lived token wrapping `identity`
    ///
    /// Returns the token and its JTI. The JTI makes two tokens issued for the
    /// same identity within the same second distinct.
    pub fn generate_ephemeral_token(
        &self,
        identity: &Identity,
        ttl: Duration,
    ) -> Result<(String, String), JwtError> {
        let now = OffsetDateTime::now_utc();
        let jti = Uuid::new_v4().to_string();

        let claims = MemberClaims {
            id: identity.user_id.clone(),
            name: identity.name.clone(),
            room_id: identity.room_id.clone(),
            iat: Some(now.unix_timestamp()),
            exp: Some((now + ttl).unix_timestamp()),
            token_type: Some(TokenType::Ephemeral),
            jti: Some(jti.clone()),
        };

        Ok((self.sign(&claims)?, jti))
    }

    fn sign(&self, claims: &MemberClaims) -> Result<String, JwtError> {
        // Explicit algorithm prevents algorithm confusion attacks
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<MemberClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60; // 60 second clock skew tolerance
        // `exp` is checked when present but member tokens may omit it
        validation.set_required_spec_claims::<&str>(&[]);

        decode::<MemberClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::Invalid,
                _ => JwtError::Validation(e.to_string()),
            })
    }

    /// Validate a bearer member token and resolve the identity it carries
    ///
    /// Ephemeral tokens are rejected here: they are only good for a single
    /// redemption through the token store.
    pub fn validate_member_token(&self, token: &str) -> Result<Identity, JwtError> {
        let claims = self.validate_token(token)?;
        if claims.token_type == Some(TokenType::Ephemeral) {
            return Err(JwtError::WrongTokenType);
        }
        if claims.id.is_empty() || claims.room_id.is_empty() {
            return Err(JwtError::Invalid);
        }
        Ok(claims.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Wrong token type")]
    WrongTokenType,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error("Token validation failed: {0}")]
    Validation(String),
}
