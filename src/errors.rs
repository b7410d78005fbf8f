use thiserror::Error;

use crate::audio::DecodeError;
use crate::engine::EngineError;

/// Errors recovered at the connection boundary and surfaced to clients as
/// `error` events. None of these terminates a connection.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("session '{0}' not found")]
    SessionNotFound(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
