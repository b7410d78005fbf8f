//! The seam between the gateway and the speech recognition engine.
//!
//! The real engine is an external collaborator: it accepts raw PCM f32
//! samples and emits timed text spans (or nothing) per processing step.
//! Everything behind [`StreamingEngine`] is opaque to the rest of the
//! gateway; the scripted and synthetic stand-ins let the full pipeline run
//! deterministically before a real model is wired in.

mod stub;

use std::sync::Arc;

use thiserror::Error;

use crate::transcript::Segment;

pub use stub::{ScriptedCue, ScriptedEngine, SyntheticEngine};

/// Errors raised by an engine call itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine failure: {0}")]
    Failed(String),
}

/// An incremental speech-transcription engine bound to one audio stream.
///
/// One instance is owned by exactly one session for that session's
/// lifetime; handles are never shared. A `process_iter` step may surface
/// zero or more tagged segments (stable before unstable); an empty result
/// means "no new segment this step" and must not be reconciled.
pub trait StreamingEngine: Send {
    /// Append raw mono 16 kHz f32 samples to the engine's buffer.
    fn insert_audio_chunk(&mut self, samples: &[f32]);

    /// Run one incremental processing step over the buffered audio.
    fn process_iter(&mut self) -> Result<Vec<Segment>, EngineError>;

    /// Drain any remaining buffered audio into at most one last segment.
    fn finish(&mut self) -> Result<Option<Segment>, EngineError>;
}

/// Allocates one fresh engine handle per session.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn StreamingEngine> + Send + Sync>;
