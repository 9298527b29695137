//! WebSocket event types and serialization
//!
//! Inbound frames are decoded into [`InboundEvent`]s for the dispatcher;
//! outbound frames are [`ServerEvent`]s, always a JSON object tagged by
//! `action`. Clients treat actions they do not know as no-ops.

use axum::extract::ws::Message;
use poker_shared::{Member, Story, Vote};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::connection::Connection;

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// What a client asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Move the room on to the next story
    NextStory,
    /// The client is leaving the room
    Leave,
    /// Anything else; ignored by the dispatcher
    Unknown(String),
}

impl EventKind {
    fn from_action(action: &str) -> Self {
        match action {
            "next_story" => EventKind::NextStory,
            "leave" => EventKind::Leave,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    /// Decode a text frame
    ///
    /// Accepts `{"action": "<name>", ...}` and, for clients that send the
    /// action on its own while unloading the page, a bare action word.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ClientFrame {
            Tagged { action: String },
            Bare(String),
        }

        match serde_json::from_str::<ClientFrame>(text) {
            Ok(ClientFrame::Tagged { action }) | Ok(ClientFrame::Bare(action)) => {
                if action.is_empty() {
                    return Err(FrameError::Malformed("empty action".to_string()));
                }
                Ok(Self::from_action(&action))
            }
            Err(e) => {
                let word = text.trim();
                let is_bare_word = !word.is_empty()
                    && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                if is_bare_word {
                    Ok(Self::from_action(word))
                } else {
                    Err(FrameError::Malformed(e.to_string()))
                }
            }
        }
    }
}

/// An event read from a connection, queued for the dispatcher
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub room_id: String,
    pub connection: Arc<Connection>,
}

impl InboundEvent {
    pub fn new(kind: EventKind, connection: Arc<Connection>) -> Self {
        Self {
            kind,
            room_id: connection.room_id.clone(),
            connection,
        }
    }
}

/// A single inbound frame that could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Malformed(String),
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events broadcast from server to clients
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A story was added to the room
    NewStory { story: Story },

    /// Somebody voted; the value stays hidden until reveal
    UserVoted { member_id: String, story_id: String },

    /// Private echo of the caller's own vote, value included
    SelfVoted {
        member_id: String,
        story_id: String,
        vote: Option<i32>,
    },

    /// Cards are turned over
    RevealStory { story_id: String, votes: Vec<Vote> },

    /// Cards are hidden again
    UnrevealStory { story_id: String },

    /// A member joined the room
    MemberJoined { member: Member },

    /// The room moved on to the next story
    NextStory,
}

impl ServerEvent {
    /// Wire name, for logging
    pub fn action(&self) -> &'static str {
        match self {
            ServerEvent::NewStory { .. } => "new_story",
            ServerEvent::UserVoted { .. } => "user_voted",
            ServerEvent::SelfVoted { .. } => "self_voted",
            ServerEvent::RevealStory { .. } => "reveal_story",
            ServerEvent::UnrevealStory { .. } => "unreveal_story",
            ServerEvent::MemberJoined { .. } => "member_joined",
            ServerEvent::NextStory => "next_story",
        }
    }

    /// Serialize into a text frame
    pub fn to_message(&self) -> Result<Message, serde_json::Error> {
        serde_json::to_string(self).map(Message::Text)
    }
}
