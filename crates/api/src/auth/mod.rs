//! Authentication module for Poker Live

pub mod ephemeral;
pub mod extractor;
pub mod jwt;

pub use ephemeral::{spawn_token_sweeper, EphemeralTokenStore, TokenError, DEFAULT_EPHEMERAL_TTL};
pub use extractor::{AuthMethod, AuthUser};
pub use jwt::{JwtError, JwtManager, MemberClaims, TokenType};
