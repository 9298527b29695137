//! Per-connection reader
//!
//! One task per live connection reads inbound frames, turns them into
//! [`InboundEvent`]s for the dispatcher, and tears the connection down once
//! the socket goes away.

use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::connection::Connection;
use super::events::{EventKind, InboundEvent};
use super::room::RoomRegistry;

/// Why a reader stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadExit {
    /// The client sent a close frame
    Closed,
    /// The stream ended without a close frame
    EndOfStream,
    /// Reading from the socket failed
    ReadError(String),
    /// The dispatcher is gone (server shutting down)
    DispatcherGone,
}

/// Read frames until the connection ends
///
/// Malformed frames are logged and skipped. Enqueueing waits when the
/// dispatch queue is full, which in turn stops reading from this socket.
pub async fn read_frames<S, E>(
    conn: Arc<Connection>,
    mut frames: S,
    events: mpsc::Sender<InboundEvent>,
) -> ReadExit
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(frame) = frames.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                tracing::info!(session_id = %conn.session_id, "WebSocket close frame received");
                return ReadExit::Closed;
            }
            // Ping/pong are answered by the protocol layer; binary is not part of the protocol
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Binary(_)) => continue,
            Err(e) => {
                tracing::info!(session_id = %conn.session_id, error = %e, "WebSocket read failed");
                return ReadExit::ReadError(e.to_string());
            }
        };

        let kind = match EventKind::decode(&text) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(
                    session_id = %conn.session_id,
                    error = %e,
                    "Dropping malformed client frame"
                );
                continue;
            }
        };

        if events
            .send(InboundEvent::new(kind, Arc::clone(&conn)))
            .await
            .is_err()
        {
            return ReadExit::DispatcherGone;
        }
    }

    ReadExit::EndOfStream
}

/// Spawn the reader for a registered connection
///
/// The read loop runs in a child task so that a panic inside it is caught at
/// that boundary. Whatever way the loop ends, the connection is closed and
/// deregistered from `rooms` exactly once here.
pub fn spawn_reader<S, E>(
    rooms: Arc<RoomRegistry>,
    conn: Arc<Connection>,
    frames: S,
    events: mpsc::Sender<InboundEvent>,
) -> JoinHandle<ReadExit>
where
    S: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        let session_id = conn.session_id;
        let reader = tokio::spawn(read_frames(Arc::clone(&conn), frames, events));

        let exit = match reader.await {
            Ok(exit) => exit,
            Err(e) if e.is_panic() => {
                tracing::error!(session_id = %session_id, error = %e, "WebSocket reader panicked");
                ReadExit::ReadError("reader panicked".to_string())
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "WebSocket reader cancelled");
                ReadExit::ReadError("reader cancelled".to_string())
            }
        };

        conn.close();
        rooms.deregister(&conn).await;

        tracing::info!(
            session_id = %session_id,
            user_id = %conn.user_id,
            room_id = %conn.room_id,
            reason = ?exit,
            "WebSocket connection closing"
        );

        exit
    })
}
