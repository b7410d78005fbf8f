use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info};

use super::stats::SessionStats;
use crate::engine::StreamingEngine;
use crate::errors::RelayError;
use crate::proto::{ServerEvent, TranscriptionStatus};
use crate::transcript::{Applied, Reconciler, SegmentKind};

/// One transcription session: exactly one engine handle (owned for the
/// session's lifetime, never shared) plus the reconciler state for its
/// stream.
pub struct Session {
    id: String,
    engine: Box<dyn StreamingEngine>,
    reconciler: Reconciler,
    started_at: DateTime<Utc>,
    last_activity: Instant,
    chunks_fed: usize,
}

impl Session {
    pub fn new(id: String, engine: Box<dyn StreamingEngine>) -> Self {
        info!("Creating session: {}", id);
        Self {
            id,
            engine,
            reconciler: Reconciler::new(),
            started_at: Utc::now(),
            last_activity: Instant::now(),
            chunks_fed: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Insert one audio chunk, run one engine step, and reconcile the
    /// result into outbound events.
    ///
    /// Events preserve the mandated relative order: stable transcriptions,
    /// then unstable ones, then a single combined-view event when anything
    /// changed.
    pub fn feed(&mut self, samples: &[f32]) -> Result<Vec<ServerEvent>, RelayError> {
        self.last_activity = Instant::now();
        self.chunks_fed += 1;

        self.engine.insert_audio_chunk(samples);
        let segments = self.engine.process_iter()?;

        let mut stable = Vec::new();
        let mut unstable = Vec::new();
        for segment in &segments {
            match self.reconciler.apply(segment) {
                Applied::Committed { start, end, text } => {
                    stable.push(ServerEvent::Transcription {
                        start,
                        end,
                        text,
                        is_final: false,
                        status: TranscriptionStatus::Completed,
                    });
                }
                Applied::Speculative { start, end, text } => {
                    unstable.push(ServerEvent::Transcription {
                        start,
                        end,
                        text,
                        is_final: false,
                        status: TranscriptionStatus::Partial,
                    });
                }
                Applied::Dropped => {
                    debug!("session {}: segment dropped by reconciler", self.id);
                }
            }
        }

        let mut events = stable;
        events.append(&mut unstable);
        if !events.is_empty() {
            events.push(ServerEvent::FullTranscription {
                text: self.reconciler.combined_text(),
                is_final: false,
            });
        }

        Ok(events)
    }

    /// Drain the engine's remaining buffered audio and fold the last
    /// segment into the committed transcript.
    ///
    /// Finalize results are always treated as committed, whatever the
    /// engine tagged them; the monotonicity guard still applies.
    pub fn finalize(&mut self) -> Result<Vec<ServerEvent>, RelayError> {
        let mut events = Vec::new();

        if let Some(mut segment) = self.engine.finish()? {
            segment.kind = SegmentKind::Stable;
            if let Applied::Committed { start, end, text } = self.reconciler.apply(&segment) {
                events.push(ServerEvent::Transcription {
                    start,
                    end,
                    text,
                    is_final: true,
                    status: TranscriptionStatus::Completed,
                });
            }
        }

        // The final combined view is the durable transcript alone; any
        // leftover speculative guess dies with the session.
        events.push(ServerEvent::FullTranscription {
            text: self.reconciler.committed_text().to_string(),
            is_final: true,
        });

        info!(
            "Session {} finalized: {} committed chars",
            self.id,
            self.reconciler.committed_text().len()
        );

        Ok(events)
    }

    /// How long since this session last processed audio.
    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.id.clone(),
            started_at: self.started_at,
            chunks_fed: self.chunks_fed,
            committed_chars: self.reconciler.committed_text().len(),
            last_committed_end: self.reconciler.last_committed_end(),
        }
    }

    /// The committed transcript so far.
    pub fn committed_text(&self) -> &str {
        self.reconciler.committed_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ScriptedCue, ScriptedEngine};
    use crate::transcript::Segment;

    fn chunk(seconds: f64) -> Vec<f32> {
        vec![0.0; (seconds * 16_000.0) as usize]
    }

    #[test]
    fn feed_orders_stable_before_unstable_before_combined() {
        let engine = ScriptedEngine::new(
            16_000,
            vec![
                // Both cues fire on the same step; the unstable one is
                // listed first to prove ordering is enforced downstream.
                ScriptedCue::new(0.5, Segment::unstable(1.0, 1.4, "wor")),
                ScriptedCue::new(0.5, Segment::stable(0.0, 1.0, "hello")),
            ],
            None,
        );
        let mut session = Session::new("s1".into(), Box::new(engine));

        let events = session.feed(&chunk(0.5)).unwrap();

        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            ServerEvent::Transcription {
                status: TranscriptionStatus::Completed,
                ..
            }
        ));
        assert!(matches!(
            events[1],
            ServerEvent::Transcription {
                status: TranscriptionStatus::Partial,
                ..
            }
        ));
        match &events[2] {
            ServerEvent::FullTranscription { text, is_final } => {
                assert_eq!(text, "hello wor");
                assert!(!is_final);
            }
            other => panic!("expected combined view, got {other:?}"),
        }
    }

    #[test]
    fn feed_with_no_new_segments_emits_nothing() {
        let engine = ScriptedEngine::new(16_000, vec![], None);
        let mut session = Session::new("s1".into(), Box::new(engine));

        assert!(session.feed(&chunk(0.3)).unwrap().is_empty());
    }

    #[test]
    fn finalize_commits_the_drained_segment_regardless_of_tag() {
        let engine = ScriptedEngine::new(
            16_000,
            vec![ScriptedCue::new(0.5, Segment::stable(0.0, 1.0, "hello"))],
            Some(Segment::unstable(1.0, 1.5, "world")),
        );
        let mut session = Session::new("s1".into(), Box::new(engine));
        session.feed(&chunk(0.5)).unwrap();

        let events = session.finalize().unwrap();

        assert!(matches!(
            events[0],
            ServerEvent::Transcription {
                is_final: true,
                status: TranscriptionStatus::Completed,
                ..
            }
        ));
        match &events[1] {
            ServerEvent::FullTranscription { text, is_final } => {
                assert_eq!(text, "hello world");
                assert!(is_final);
            }
            other => panic!("expected final combined view, got {other:?}"),
        }
    }

    #[test]
    fn finalize_with_no_prior_segments_yields_empty_final_text() {
        let engine = ScriptedEngine::new(16_000, vec![], None);
        let mut session = Session::new("s1".into(), Box::new(engine));

        let events = session.finalize().unwrap();

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ServerEvent::FullTranscription { text, is_final: true } if text.is_empty()
        ));
    }
}
