//! Inbound event dispatcher
//!
//! The single consumer of every reader's events. Events from one connection
//! are handled in the order that connection sent them; there is no ordering
//! across connections.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::events::{EventKind, InboundEvent, ServerEvent};
use super::room::RoomRegistry;

pub struct Dispatcher {
    rooms: Arc<RoomRegistry>,
    events: mpsc::Receiver<InboundEvent>,
}

impl Dispatcher {
    pub fn new(rooms: Arc<RoomRegistry>, events: mpsc::Receiver<InboundEvent>) -> Self {
        Self { rooms, events }
    }

    /// Run on its own task until every event sender is dropped
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        tracing::debug!("Event dispatcher started");

        while let Some(event) = self.events.recv().await {
            let session_id = event.connection.session_id;
            // A panic while handling one event must not take the dispatcher down
            if let Err(panic) = AssertUnwindSafe(dispatch(&self.rooms, event)).catch_unwind().await {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    session_id = %session_id,
                    panic = %message,
                    "Event dispatch panicked"
                );
            }
        }

        tracing::debug!("Event dispatcher stopped");
    }
}

async fn dispatch(rooms: &RoomRegistry, event: InboundEvent) {
    match event.kind {
        EventKind::NextStory => {
            rooms
                .broadcast(&event.room_id, &ServerEvent::NextStory)
                .await;
        }
        EventKind::Leave => {
            if rooms.deregister(&event.connection).await {
                tracing::info!(
                    session_id = %event.connection.session_id,
                    room_id = %event.room_id,
                    "Client left room"
                );
            }
            event.connection.close();
        }
        EventKind::Unknown(action) => {
            tracing::debug!(
                session_id = %event.connection.session_id,
                action = %action,
                "Ignoring unknown client action"
            );
        }
    }
}
