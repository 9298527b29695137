//! WebSocket support for live room updates
//!
//! # Architecture
//!
//! - **Connection**: an authenticated socket bound to one room
//! - **Room**: the registry of connections per room, and broadcast fanout
//! - **Reader**: one task per connection turning frames into events
//! - **Dispatcher**: the single consumer of inbound events
//! - **State**: registry + dispatch queue shared across handlers
//! - **Handler**: Axum WebSocket route handler
//! - **Events**: inbound and outbound event definitions

pub mod connection;
pub mod dispatcher;
pub mod events;
pub mod handler;
pub mod reader;
pub mod room;
pub mod state;

pub use connection::{Connection, ConnectionError};
pub use dispatcher::Dispatcher;
pub use events::{EventKind, FrameError, InboundEvent, ServerEvent};
pub use handler::ws_handler;
pub use reader::ReadExit;
pub use room::{BroadcastReport, RoomRegistry};
pub use state::{WebSocketState, WebSocketStats};
