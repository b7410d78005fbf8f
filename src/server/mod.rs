//! Connection handling for the streaming protocol
//!
//! `Connection` is the transport-independent protocol state machine: it
//! consumes inbound commands for one connection and emits outbound events.
//! Two bindings drive it: the axum websocket endpoint in [`ws`] and the
//! in-process duplex channel in [`channel`] used by the client harness and
//! tests.

mod channel;
mod connection;
mod ws;

pub use channel::spawn_connection;
pub use connection::{CommandHandler, Connection};
pub use ws::{create_router, AppState};
