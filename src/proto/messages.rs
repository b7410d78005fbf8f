use serde::{Deserialize, Serialize};

/// Inbound commands sent by clients, one JSON object per message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Bind a session to this connection. A missing `session_id` asks the
    /// server to generate one.
    StartSession {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// One chunk of base64-encoded little-endian f32 PCM, mono, 16 kHz.
    ProcessAudio { audio: String },
    /// Finalize the bound session and release it.
    EndSession,
}

/// Whether a transcription event is durable or still revisable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionStatus {
    /// The text has been committed and will not change.
    Completed,
    /// A speculative result that later events replace.
    Partial,
}

/// Outbound events, one JSON object per message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    SessionStarted {
        session_id: String,
    },
    /// One reconciled segment.
    Transcription {
        start: f64,
        end: f64,
        text: String,
        is_final: bool,
        status: TranscriptionStatus,
    },
    /// The combined display transcript (committed text plus the current
    /// speculative tail).
    FullTranscription {
        text: String,
        is_final: bool,
    },
    SessionEnded {
        session_id: String,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Helper to construct an error event for the client.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// True for events that carry transcribed text (used by the harness to
    /// spot the first real response).
    pub fn is_transcription(&self) -> bool {
        matches!(
            self,
            Self::Transcription { .. } | Self::FullTranscription { .. }
        )
    }

    /// True for events emitted by finalize.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Transcription { is_final: true, .. }
                | Self::FullTranscription { is_final: true, .. }
        )
    }
}
