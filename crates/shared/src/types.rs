//! Common types used across Poker Live

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::PokerError;

/// Highest card value a member can vote (the last Fibonacci card in the deck).
pub const MAX_VOTE: i32 = 89;

// =============================================================================
// Identity
// =============================================================================

/// Authenticated room member, resolved from a bearer JWT or an ephemeral token.
///
/// Every live connection is bound to exactly one identity and therefore to
/// exactly one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub room_id: String,
}

impl Identity {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        room_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            room_id: room_id.into(),
        }
    }
}

// =============================================================================
// Room entities
// =============================================================================

/// A story as created by the web app and relayed to the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    pub room_id: String,
    pub created_at: String,
}

impl Story {
    /// Check the fields a client needs to render the story.
    pub fn validate(&self) -> Result<(), PokerError> {
        require("id", &self.id)?;
        require("title", &self.title)?;
        require("roomId", &self.room_id)?;
        require("createdAt", &self.created_at)?;

        OffsetDateTime::parse(&self.created_at, &Rfc3339).map_err(|_| {
            PokerError::Validation("createdAt must be an RFC 3339 datetime".to_string())
        })?;

        Ok(())
    }
}

/// Room member as announced when they join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
}

impl Member {
    pub fn validate(&self) -> Result<(), PokerError> {
        require("member.id", &self.id)?;
        require("member.name", &self.name)
    }
}

/// A stored vote, as read back when a story is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub member_id: String,
    pub story_id: String,
    /// `None` means the member passed / withdrew their card.
    pub vote: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validate a card value. `None` is a valid (empty) vote.
pub fn validate_vote(vote: Option<i32>) -> Result<(), PokerError> {
    match vote {
        Some(v) if !(0..=MAX_VOTE).contains(&v) => Err(PokerError::Validation(format!(
            "vote must be between 0 and {MAX_VOTE}"
        ))),
        _ => Ok(()),
    }
}

/// Reject empty or whitespace-only required fields.
pub fn require(field: &'static str, value: &str) -> Result<(), PokerError> {
    if value.trim().is_empty() {
        return Err(PokerError::MissingField(field));
    }
    Ok(())
}
