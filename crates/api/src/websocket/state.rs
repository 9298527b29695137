//! WebSocket state management
//!
//! Owns the room registry and the dispatch queue, and wires each new socket
//! into them.

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream};
use poker_shared::Identity;
use std::fmt::Display;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::connection::{Connection, OUTBOUND_QUEUE_CAPACITY};
use super::dispatcher::Dispatcher;
use super::events::{InboundEvent, ServerEvent};
use super::reader::spawn_reader;
use super::room::{BroadcastReport, RoomRegistry};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// WebSocket state shared by the upgrade handler and HTTP handlers
#[derive(Clone)]
pub struct WebSocketState {
    /// Room ID -> connections
    pub rooms: Arc<RoomRegistry>,

    /// Queue feeding the dispatcher
    events: mpsc::Sender<InboundEvent>,
}

impl WebSocketState {
    /// Create new WebSocket state and the dispatcher that drains its queue
    ///
    /// The caller spawns the dispatcher; it stops once every clone of this
    /// state and every reader are gone.
    pub fn new(queue_capacity: usize) -> (Self, Dispatcher) {
        let rooms = Arc::new(RoomRegistry::new());
        let (events, receiver) = mpsc::channel(queue_capacity.max(1));
        let dispatcher = Dispatcher::new(Arc::clone(&rooms), receiver);

        (Self { rooms, events }, dispatcher)
    }

    /// Register a freshly upgraded, authenticated socket
    ///
    /// Spawns the connection's writer (draining its outbound channel into
    /// `sink`) and its reader (feeding `frames` to the dispatcher). Whichever
    /// side of the socket fails first deregisters the connection.
    pub async fn register_authenticated_connection<W, R, E>(
        &self,
        identity: &Identity,
        sink: W,
        frames: R,
    ) -> Arc<Connection>
    where
        W: Sink<Message> + Unpin + Send + 'static,
        W::Error: Display + Send,
        R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let conn = Arc::new(Connection::new(identity, tx));

        // Registered before the writer runs, so a failed first write finds it
        self.rooms.register(Arc::clone(&conn)).await;
        spawn_writer(Arc::clone(&self.rooms), Arc::downgrade(&conn), rx, sink);
        spawn_reader(
            Arc::clone(&self.rooms),
            Arc::clone(&conn),
            frames,
            self.events.clone(),
        );

        tracing::info!(
            session_id = %conn.session_id,
            user_id = %conn.user_id,
            room_id = %conn.room_id,
            "WebSocket connection added"
        );

        conn
    }

    /// Broadcast an event to a room
    pub async fn broadcast(&self, room_id: &str, event: &ServerEvent) -> BroadcastReport {
        self.rooms.broadcast(room_id, event).await
    }

    /// Send an event to one member's own connections in a room
    pub async fn send_to_user(&self, room_id: &str, user_id: &str, event: &ServerEvent) -> usize {
        self.rooms.send_to_user(room_id, user_id, event).await
    }

    /// Close every connection (process shutdown)
    pub async fn close_all(&self) -> usize {
        self.rooms.close_all().await
    }

    /// Wait for every connection to leave the registry
    ///
    /// Connections leave once their client answers the close frame or the
    /// socket drops. Returns `false` if some were still open after `timeout`.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let drained = tokio::time::timeout(timeout, async {
            while self.rooms.connection_count().await > 0 {
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        })
        .await
        .is_ok();

        if drained {
            tracing::info!("All WebSocket connections closed");
        } else {
            let remaining = self.rooms.connection_count().await;
            tracing::warn!(
                remaining,
                "WebSocket connections still open after drain timeout"
            );
        }

        drained
    }

    /// Get statistics about the WebSocket state
    pub async fn get_stats(&self) -> WebSocketStats {
        WebSocketStats {
            active_connections: self.rooms.connection_count().await,
            active_rooms: self.rooms.room_count().await,
        }
    }
}

/// Drain a connection's outbound channel into its socket
///
/// Exits after sending a close frame, once the connection is dropped, or
/// after a failed write. A failed write closes the channel and deregisters
/// the connection, so later broadcasts neither count nor reach it.
fn spawn_writer<W>(
    rooms: Arc<RoomRegistry>,
    conn: Weak<Connection>,
    mut outbound: mpsc::Receiver<Message>,
    mut sink: W,
) -> JoinHandle<()>
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display + Send,
{
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(e) = sink.send(message).await {
                outbound.close();
                if let Some(conn) = conn.upgrade() {
                    tracing::info!(session_id = %conn.session_id, error = %e, "WebSocket write failed");
                    rooms.deregister(&conn).await;
                }
                break;
            }
            if closing {
                break;
            }
        }

        drop(outbound);
        let _ = sink.close().await;
    })
}

/// Statistics about WebSocket connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebSocketStats {
    /// Number of active connections
    pub active_connections: usize,
    /// Number of rooms with at least one connection
    pub active_rooms: usize,
}
