//! WebSocket connection management
//!
//! Represents an authenticated WebSocket connection bound to one room.

use axum::extract::ws::Message;
use poker_shared::Identity;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Frames queued for one connection before it counts as stalled
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Represents an active WebSocket connection
///
/// Outbound frames go through a bounded channel drained by the connection's
/// writer task. Once that task has exited (the socket write failed or the
/// socket was closed) every further send fails with [`ConnectionError::Lost`];
/// a peer that stops reading fills the queue and fails with
/// [`ConnectionError::Stalled`].
#[derive(Debug)]
pub struct Connection {
    /// Unique session ID for this connection
    pub session_id: Uuid,

    /// Authenticated member ID
    pub user_id: String,

    /// Member display name
    pub user_name: String,

    /// The one room this connection belongs to
    pub room_id: String,

    /// Channel to the writer task
    sender: mpsc::Sender<Message>,
}

impl Connection {
    /// Create a new connection for an authenticated identity
    pub fn new(identity: &Identity, sender: mpsc::Sender<Message>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: identity.user_id.clone(),
            user_name: identity.name.clone(),
            room_id: identity.room_id.clone(),
            sender,
        }
    }

    /// Queue a frame for this connection
    pub fn send(&self, message: Message) -> Result<(), ConnectionError> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => ConnectionError::Stalled {
                session_id: self.session_id,
            },
            TrySendError::Closed(_) => ConnectionError::Lost {
                session_id: self.session_id,
            },
        })
    }

    /// Ask the writer task to send a close frame and stop
    ///
    /// No-op when the writer is already gone. A stalled peer gets no close
    /// frame; its queue is full and it is evicted instead.
    pub fn close(&self) {
        match self.sender.try_send(Message::Close(None)) {
            Ok(()) => tracing::debug!(session_id = %self.session_id, "Close frame queued"),
            Err(TrySendError::Full(_)) => {
                tracing::debug!(session_id = %self.session_id, "Outbound queue full, close frame dropped")
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Whether the writer task has exited
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection {session_id} lost")]
    Lost { session_id: Uuid },
    #[error("Connection {session_id} stopped reading")]
    Stalled { session_id: Uuid },
}
