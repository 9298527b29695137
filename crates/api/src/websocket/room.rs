//! Room registry and broadcast fanout
//!
//! Maps room IDs to the connections currently in them. Every mutation and
//! every iteration of a room's set happens under the registry lock; fanout
//! works on a snapshot so socket writes never run with the lock held.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ServerEvent;

/// Unordered set of connections with O(1) insert and remove
///
/// `members` holds the connections, `index` maps each session ID to its slot.
/// Removal swaps the last member into the freed slot, so iteration order is
/// not stable across removals.
#[derive(Default)]
struct Room {
    members: Vec<Arc<Connection>>,
    index: HashMap<Uuid, usize>,
}

impl Room {
    fn insert(&mut self, conn: Arc<Connection>) -> bool {
        if self.index.contains_key(&conn.session_id) {
            return false;
        }
        self.index.insert(conn.session_id, self.members.len());
        self.members.push(conn);
        true
    }

    fn remove(&mut self, session_id: &Uuid) -> Option<Arc<Connection>> {
        let slot = self.index.remove(session_id)?;
        let removed = self.members.swap_remove(slot);
        if let Some(moved) = self.members.get(slot) {
            self.index.insert(moved.session_id, slot);
        }
        Some(removed)
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Outcome of a single broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the payload was queued for
    pub delivered: usize,
    /// Connections found dead and deregistered
    pub evicted: usize,
}

/// Room ID -> connections index
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Room>>,
}

impl RoomRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to its room
    ///
    /// Returns `false` if it was already registered.
    pub async fn register(&self, conn: Arc<Connection>) -> bool {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(conn.room_id.clone()).or_default();
        let inserted = room.insert(Arc::clone(&conn));

        if inserted {
            tracing::debug!(
                room_id = %conn.room_id,
                session_id = %conn.session_id,
                room_size = room.len(),
                "Connection joined room"
            );
        }

        inserted
    }

    /// Remove a connection from its room
    ///
    /// Idempotent: returns `false` when the connection was already removed,
    /// e.g. by a failed broadcast racing the reader's own cleanup.
    pub async fn deregister(&self, conn: &Connection) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(&conn.room_id) else {
            return false;
        };
        if room.remove(&conn.session_id).is_none() {
            return false;
        }

        let room_size = room.len();
        if room.is_empty() {
            rooms.remove(&conn.room_id);
        }

        tracing::debug!(
            room_id = %conn.room_id,
            session_id = %conn.session_id,
            room_size,
            "Connection left room"
        );

        true
    }

    /// Point-in-time copy of a room's connections, in no particular order
    pub async fn snapshot(&self, room_id: &str) -> Vec<Arc<Connection>> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .map(|room| room.members.clone())
            .unwrap_or_default()
    }

    /// Send an event to every connection in a room
    ///
    /// A failed send does not stop delivery to the others. Failed connections
    /// are deregistered together once the sweep is done.
    pub async fn broadcast(&self, room_id: &str, event: &ServerEvent) -> BroadcastReport {
        let message = match event.to_message() {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = ?e, action = event.action(), "Failed to serialize WebSocket event");
                return BroadcastReport::default();
            }
        };

        let conns = self.snapshot(room_id).await;
        if conns.is_empty() {
            tracing::debug!(
                room_id = %room_id,
                action = event.action(),
                "No connections in room - nothing to broadcast"
            );
            return BroadcastReport::default();
        }

        let mut delivered = 0;
        let mut failed = Vec::new();
        for conn in conns {
            match conn.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        session_id = %conn.session_id,
                        error = %e,
                        "Failed to queue event for connection"
                    );
                    failed.push(conn);
                }
            }
        }

        let mut evicted = 0;
        for conn in &failed {
            if self.deregister(conn).await {
                evicted += 1;
            }
        }

        tracing::debug!(
            room_id = %room_id,
            action = event.action(),
            recipients = delivered,
            failed = failed.len(),
            evicted,
            "Broadcast event to room"
        );

        BroadcastReport { delivered, evicted }
    }

    /// Send an event only to one member's connections within a room
    ///
    /// Returns how many connections it was queued for. Dead connections are
    /// evicted the same way [`RoomRegistry::broadcast`] does.
    pub async fn send_to_user(&self, room_id: &str, user_id: &str, event: &ServerEvent) -> usize {
        let message = match event.to_message() {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = ?e, action = event.action(), "Failed to serialize WebSocket event");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for conn in self.snapshot(room_id).await {
            if conn.user_id != user_id {
                continue;
            }
            match conn.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => failed.push(conn),
            }
        }

        for conn in &failed {
            self.deregister(conn).await;
        }

        delivered
    }

    /// Send a close frame to every registered connection
    ///
    /// Used on shutdown; each connection's reader deregisters it once the
    /// client acknowledges the close.
    pub async fn close_all(&self) -> usize {
        let rooms = self.rooms.read().await;
        let mut closed = 0;
        for room in rooms.values() {
            for conn in &room.members {
                conn.close();
                closed += 1;
            }
        }

        tracing::info!(connections = closed, rooms = rooms.len(), "Closing all WebSocket connections");
        closed
    }

    /// Number of connections in a room
    pub async fn room_size(&self, room_id: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map(Room::len).unwrap_or(0)
    }

    /// Number of non-empty rooms
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }

    /// Number of registered connections across all rooms
    pub async fn connection_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.values().map(Room::len).sum()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
