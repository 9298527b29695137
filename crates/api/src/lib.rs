//! Poker Live API Library
//!
//! The live-update server for planning poker rooms: authenticated WebSocket
//! connections grouped by room, and HTTP endpoints that fan room events out
//! to them.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
