use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a live transcription session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: String,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Number of audio chunks fed so far
    pub chunks_fed: usize,

    /// Length of the committed transcript in characters
    pub committed_chars: usize,

    /// End time (seconds) of the last committed segment
    pub last_committed_end: f64,
}
