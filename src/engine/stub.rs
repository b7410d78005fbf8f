//! Stand-in engines that produce deterministic transcripts.
//!
//! Neither performs inference: emission is keyed on how much audio has been
//! buffered, so replaying the same chunks always yields the same segments.
//! `ScriptedEngine` follows an explicit cue list (tests, the replay bench);
//! `SyntheticEngine` fabricates a rolling transcript (the server binary
//! before a real model is integrated).

use std::collections::VecDeque;

use tracing::debug;

use super::{EngineError, StreamingEngine};
use crate::transcript::Segment;

/// A segment released once the engine has buffered `at` seconds of audio.
#[derive(Debug, Clone)]
pub struct ScriptedCue {
    pub at: f64,
    pub segment: Segment,
}

impl ScriptedCue {
    pub fn new(at: f64, segment: Segment) -> Self {
        Self { at, segment }
    }
}

/// Replays a fixed script keyed on buffered audio duration.
pub struct ScriptedEngine {
    sample_rate: u32,
    buffered_samples: usize,
    cues: VecDeque<ScriptedCue>,
    final_segment: Option<Segment>,
}

impl ScriptedEngine {
    /// `cues` must be ordered by their `at` time; `final_segment` is what
    /// `finish` drains out of the buffer (if anything).
    pub fn new(sample_rate: u32, cues: Vec<ScriptedCue>, final_segment: Option<Segment>) -> Self {
        Self {
            sample_rate,
            buffered_samples: 0,
            cues: cues.into(),
            final_segment,
        }
    }

    fn buffered_seconds(&self) -> f64 {
        self.buffered_samples as f64 / self.sample_rate as f64
    }
}

impl StreamingEngine for ScriptedEngine {
    fn insert_audio_chunk(&mut self, samples: &[f32]) {
        self.buffered_samples += samples.len();
    }

    fn process_iter(&mut self) -> Result<Vec<Segment>, EngineError> {
        let elapsed = self.buffered_seconds();
        let mut due = Vec::new();
        while self.cues.front().is_some_and(|cue| cue.at <= elapsed) {
            if let Some(cue) = self.cues.pop_front() {
                due.push(cue.segment);
            }
        }
        if !due.is_empty() {
            debug!("scripted engine released {} segment(s) at {:.2}s", due.len(), elapsed);
        }
        Ok(due)
    }

    fn finish(&mut self) -> Result<Option<Segment>, EngineError> {
        self.cues.clear();
        Ok(self.final_segment.take())
    }
}

/// Fabricates a transcript from buffered audio alone: one stable span per
/// full `step` seconds, plus an unstable tail for the remainder.
pub struct SyntheticEngine {
    sample_rate: u32,
    step: f64,
    buffered_samples: usize,
    cursor: f64,
    counter: usize,
}

impl SyntheticEngine {
    pub fn new(sample_rate: u32, step: f64) -> Self {
        Self {
            sample_rate,
            step,
            buffered_samples: 0,
            cursor: 0.0,
            counter: 0,
        }
    }

    fn buffered_seconds(&self) -> f64 {
        self.buffered_samples as f64 / self.sample_rate as f64
    }

    fn next_text(&mut self) -> String {
        self.counter += 1;
        format!("segment {}", self.counter)
    }
}

impl StreamingEngine for SyntheticEngine {
    fn insert_audio_chunk(&mut self, samples: &[f32]) {
        self.buffered_samples += samples.len();
    }

    fn process_iter(&mut self) -> Result<Vec<Segment>, EngineError> {
        let elapsed = self.buffered_seconds();
        let mut out = Vec::new();
        while self.cursor + self.step <= elapsed {
            let start = self.cursor;
            self.cursor += self.step;
            let text = self.next_text();
            out.push(Segment::stable(start, self.cursor, text));
        }
        if elapsed > self.cursor {
            let guess = format!("segment {}", self.counter + 1);
            out.push(Segment::unstable(self.cursor, elapsed, guess));
        }
        Ok(out)
    }

    fn finish(&mut self) -> Result<Option<Segment>, EngineError> {
        let elapsed = self.buffered_seconds();
        if elapsed <= self.cursor {
            return Ok(None);
        }
        let start = self.cursor;
        self.cursor = elapsed;
        let text = self.next_text();
        Ok(Some(Segment::stable(start, elapsed, text)))
    }
}
