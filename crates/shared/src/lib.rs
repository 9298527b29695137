//! Poker Live Shared Types and Utilities
//!
//! Domain types, errors, and the vote read path shared by the live-update server.

pub mod db;
pub mod error;
pub mod types;

pub use db::*;
pub use error::*;
pub use types::*;
