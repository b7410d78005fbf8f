use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::proto::{ClientCommand, ServerEvent};
use crate::server::connection::{CommandHandler, Connection};
use crate::session::SessionRegistry;

/// Spawn a connection task served over an in-process duplex channel pair.
///
/// Commands sent on the returned sender are handled in arrival order and
/// the resulting events delivered on the returned receiver, exactly as the
/// websocket binding would deliver them. Dropping the sender closes the
/// connection, which finalizes any bound session. Used by the client
/// harness and tests, where transport framing is out of scope.
pub fn spawn_connection(
    registry: Arc<SessionRegistry>,
) -> (mpsc::Sender<ClientCommand>, mpsc::Receiver<ServerEvent>) {
    let (command_tx, mut command_rx) = mpsc::channel::<ClientCommand>(64);
    let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(64);

    tokio::spawn(async move {
        let mut connection = Connection::new(registry);

        'outer: while let Some(command) = command_rx.recv().await {
            for event in connection.handle(command).await {
                if event_tx.send(event).await.is_err() {
                    debug!("Event receiver dropped; closing connection");
                    break 'outer;
                }
            }
        }

        connection.close().await;
    });

    (command_tx, event_rx)
}
