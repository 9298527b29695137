//! Error types for Poker Live

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PokerError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),
}
