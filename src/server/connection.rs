use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::audio::decode_base64_pcm;
use crate::errors::RelayError;
use crate::proto::{ClientCommand, ServerEvent};
use crate::session::SessionRegistry;

/// Consumes inbound protocol messages for one connection and produces the
/// outbound events to deliver, in order. Implemented by [`Connection`];
/// the transport bindings are generic over this seam.
#[async_trait]
pub trait CommandHandler: Send {
    async fn handle(&mut self, command: ClientCommand) -> Vec<ServerEvent>;

    /// Transport close. Any bound session is finalized as cleanup.
    async fn close(&mut self);
}

/// Per-connection protocol state machine.
///
/// Idle (no session bound) → Active (session bound) → Idle again after
/// `end_session`. Malformed input and recoverable errors produce an `error`
/// event and leave the state unchanged; nothing here terminates the
/// connection.
pub struct Connection {
    registry: Arc<SessionRegistry>,
    active: Option<String>,
}

impl Connection {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            active: None,
        }
    }

    /// The currently bound session id, if any.
    pub fn active_session(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Parse one raw JSON message and handle it. Undecodable input (bad
    /// JSON, unknown command) is non-fatal: the client gets an `error`
    /// event and the connection state is untouched.
    pub async fn handle_text(&mut self, raw: &str) -> Vec<ServerEvent> {
        match serde_json::from_str::<ClientCommand>(raw) {
            Ok(command) => self.handle_command(command).await,
            Err(err) => {
                warn!("Failed to parse client message: {}", err);
                vec![ServerEvent::error(format!("invalid message: {err}"))]
            }
        }
    }

    async fn handle_command(&mut self, command: ClientCommand) -> Vec<ServerEvent> {
        match command {
            ClientCommand::StartSession { session_id } => self.start_session(session_id).await,
            ClientCommand::ProcessAudio { audio } => self.process_audio(&audio).await,
            ClientCommand::EndSession => self.end_session().await,
        }
    }

    async fn start_session(&mut self, session_id: Option<String>) -> Vec<ServerEvent> {
        if self.active.is_some() {
            return vec![ServerEvent::error("session already started")];
        }

        match self.registry.create(session_id).await {
            Ok(session_id) => {
                info!("Connection bound to session {}", session_id);
                self.active = Some(session_id.clone());
                vec![ServerEvent::SessionStarted { session_id }]
            }
            Err(err) => vec![ServerEvent::error(err.to_string())],
        }
    }

    async fn process_audio(&mut self, audio: &str) -> Vec<ServerEvent> {
        let Some(session_id) = self.active.clone() else {
            return vec![ServerEvent::error("session not started")];
        };

        let samples = match decode_audio(audio) {
            Ok(samples) => samples,
            Err(err) => return vec![ServerEvent::error(err.to_string())],
        };

        match self.registry.feed(&session_id, &samples).await {
            Ok(events) => events,
            Err(err @ RelayError::SessionNotFound(_)) => {
                // The session was reaped underneath us; unbind so further
                // commands fail consistently with "session not started".
                warn!("Session {} vanished mid-stream: {}", session_id, err);
                self.active = None;
                vec![ServerEvent::error(err.to_string())]
            }
            Err(err) => vec![ServerEvent::error(err.to_string())],
        }
    }

    async fn end_session(&mut self) -> Vec<ServerEvent> {
        let Some(session_id) = self.active.take() else {
            return vec![ServerEvent::error("session not started")];
        };

        match self.registry.finalize(&session_id).await {
            Ok(mut events) => {
                events.push(ServerEvent::SessionEnded { session_id });
                events
            }
            Err(err) => vec![ServerEvent::error(err.to_string())],
        }
    }
}

fn decode_audio(audio: &str) -> Result<Vec<f32>, RelayError> {
    Ok(decode_base64_pcm(audio)?)
}

#[async_trait]
impl CommandHandler for Connection {
    async fn handle(&mut self, command: ClientCommand) -> Vec<ServerEvent> {
        self.handle_command(command).await
    }

    async fn close(&mut self) {
        let Some(session_id) = self.active.take() else {
            return;
        };

        // Implicit finalize: the client is gone, so the final events have
        // no recipient and are dropped after logging.
        match self.registry.finalize(&session_id).await {
            Ok(events) => {
                info!(
                    "Transport closed; session {} finalized ({} event(s) discarded)",
                    session_id,
                    events.len()
                );
            }
            Err(err) => {
                debug!(
                    "Transport closed; session {} already gone: {}",
                    session_id, err
                );
            }
        }
    }
}
