use serde::{Deserialize, Serialize};
use tracing::debug;

/// Whether a recognition result is revisable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// The engine will not revise this result again.
    Stable,
    /// A tentative guess that later steps may replace.
    Unstable,
}

/// One timed recognition result emitted by the engine.
///
/// `start`/`end` are seconds from the beginning of the audio stream,
/// forming a half-open interval. Empty text means "no new content this
/// step" and is treated as absence, not as an empty result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn stable(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            kind: SegmentKind::Stable,
        }
    }

    pub fn unstable(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            kind: SegmentKind::Unstable,
        }
    }
}

/// What `Reconciler::apply` did with a segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The segment was appended to the committed transcript.
    Committed { start: f64, end: f64, text: String },
    /// The segment replaced the speculative tail.
    Speculative { start: f64, end: f64, text: String },
    /// The segment carried no new content or re-emitted committed audio.
    Dropped,
}

/// Pure state machine that merges partial results into committed text plus
/// a speculative tail. No I/O.
///
/// The engine may re-emit overlapping windows as it gains context; without
/// the start-time monotonicity guard the committed transcript would contain
/// duplicated words. Speculative text is inherently revisable and is never
/// merged into the durable record.
#[derive(Debug, Default)]
pub struct Reconciler {
    committed: String,
    last_committed_end: f64,
    speculative: String,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one segment into the transcript state.
    ///
    /// Stable segments are accepted only if they start at or after the end
    /// of the last committed segment (`>=`, so a segment starting exactly
    /// where the previous one ended is not lost). Anything starting earlier
    /// is a duplicate re-emission and is silently dropped — that is the
    /// de-duplication guard, not an error. Unstable segments always replace
    /// the previous speculative tail.
    pub fn apply(&mut self, segment: &Segment) -> Applied {
        let text = segment.text.trim();
        if text.is_empty() {
            // "No new content this step" — must not become an empty commit.
            return Applied::Dropped;
        }

        match segment.kind {
            SegmentKind::Stable => {
                if segment.start < self.last_committed_end {
                    debug!(
                        "dropping re-emitted segment [{:.2}, {:.2}) \"{}\" (committed through {:.2})",
                        segment.start, segment.end, text, self.last_committed_end
                    );
                    return Applied::Dropped;
                }
                if !self.committed.is_empty() {
                    self.committed.push(' ');
                }
                self.committed.push_str(text);
                self.last_committed_end = segment.end;
                // The commit supersedes whatever guess was pending.
                self.speculative.clear();
                Applied::Committed {
                    start: segment.start,
                    end: segment.end,
                    text: text.to_string(),
                }
            }
            SegmentKind::Unstable => {
                // Replace, never append: every step's guess supersedes the
                // previous one, even when it overlaps committed audio.
                self.speculative.clear();
                self.speculative.push_str(text);
                Applied::Speculative {
                    start: segment.start,
                    end: segment.end,
                    text: text.to_string(),
                }
            }
        }
    }

    /// The durable transcript. Only ever appended to.
    pub fn committed_text(&self) -> &str {
        &self.committed
    }

    /// The current replaceable tail (may be empty).
    pub fn speculative_text(&self) -> &str {
        &self.speculative
    }

    /// End time of the last committed segment. Non-decreasing.
    pub fn last_committed_end(&self) -> f64 {
        self.last_committed_end
    }

    /// Display view: committed text followed by the speculative tail.
    pub fn combined_text(&self) -> String {
        if self.speculative.is_empty() {
            self.committed.clone()
        } else if self.committed.is_empty() {
            self.speculative.clone()
        } else {
            format!("{} {}", self.committed, self.speculative)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotone_stable_segments_concatenate_in_order() {
        let mut rec = Reconciler::new();
        rec.apply(&Segment::stable(0.0, 1.0, "hello"));
        rec.apply(&Segment::stable(1.0, 2.0, "world"));
        rec.apply(&Segment::stable(2.5, 3.0, "again"));

        assert_eq!(rec.committed_text(), "hello world again");
        assert_eq!(rec.last_committed_end(), 3.0);
    }

    #[test]
    fn overlapping_stable_segment_is_dropped() {
        let mut rec = Reconciler::new();
        rec.apply(&Segment::stable(0.0, 2.0, "hello world"));

        let applied = rec.apply(&Segment::stable(1.5, 2.5, "world again"));

        assert_eq!(applied, Applied::Dropped);
        assert_eq!(rec.committed_text(), "hello world");
        assert_eq!(rec.last_committed_end(), 2.0);
    }

    #[test]
    fn stable_segment_starting_exactly_at_boundary_is_accepted() {
        let mut rec = Reconciler::new();
        rec.apply(&Segment::stable(0.0, 1.0, "one"));

        let applied = rec.apply(&Segment::stable(1.0, 2.0, "two"));

        assert!(matches!(applied, Applied::Committed { .. }));
        assert_eq!(rec.committed_text(), "one two");
    }

    #[test]
    fn empty_text_is_absence_not_an_empty_commit() {
        let mut rec = Reconciler::new();
        rec.apply(&Segment::stable(0.0, 1.0, "hello"));

        // A zero-content segment must not advance the committed boundary.
        assert_eq!(rec.apply(&Segment::stable(1.0, 5.0, "")), Applied::Dropped);
        assert_eq!(rec.apply(&Segment::stable(1.0, 5.0, "   ")), Applied::Dropped);
        assert_eq!(rec.last_committed_end(), 1.0);

        // Nor may it clear the speculative tail.
        rec.apply(&Segment::unstable(1.0, 1.5, "wor"));
        assert_eq!(rec.apply(&Segment::unstable(1.0, 1.6, "")), Applied::Dropped);
        assert_eq!(rec.speculative_text(), "wor");
    }

    #[test]
    fn unstable_replaces_never_appends() {
        let mut rec = Reconciler::new();
        rec.apply(&Segment::unstable(0.0, 0.5, "he"));
        rec.apply(&Segment::unstable(0.0, 0.8, "hel"));

        assert_eq!(rec.speculative_text(), "hel");
        assert_eq!(rec.committed_text(), "");
    }

    #[test]
    fn unstable_inside_committed_range_still_updates_display() {
        let mut rec = Reconciler::new();
        rec.apply(&Segment::stable(0.0, 2.0, "hello world"));

        let applied = rec.apply(&Segment::unstable(0.5, 1.5, "wor"));

        assert!(matches!(applied, Applied::Speculative { .. }));
        assert_eq!(rec.combined_text(), "hello world wor");
        assert_eq!(rec.committed_text(), "hello world");
    }

    #[test]
    fn combined_text_joins_with_single_space() {
        let mut rec = Reconciler::new();
        assert_eq!(rec.combined_text(), "");

        rec.apply(&Segment::unstable(0.0, 0.5, "guess"));
        assert_eq!(rec.combined_text(), "guess");

        rec.apply(&Segment::stable(0.0, 1.0, "hello"));
        assert_eq!(rec.combined_text(), "hello");

        rec.apply(&Segment::unstable(1.0, 1.3, "wo"));
        assert_eq!(rec.combined_text(), "hello wo");
    }

    #[test]
    fn interleaved_unstable_is_fully_superseded() {
        // Scenario from the protocol contract: the unstable guess received
        // between two stable results never reaches the committed transcript
        // and is cleared by the following commit.
        let mut rec = Reconciler::new();
        rec.apply(&Segment::stable(0.0, 1.0, "hello"));
        rec.apply(&Segment::unstable(0.5, 1.5, "wor"));
        rec.apply(&Segment::stable(1.0, 2.0, "world"));

        assert_eq!(rec.committed_text(), "hello world");
        assert_eq!(rec.combined_text(), "hello world");
        assert_eq!(rec.speculative_text(), "");
    }

    #[test]
    fn committed_boundary_is_non_decreasing() {
        let mut rec = Reconciler::new();
        let mut previous = rec.last_committed_end();

        let script = [
            Segment::stable(0.0, 1.0, "a"),
            Segment::stable(0.2, 3.0, "dup"),
            Segment::unstable(1.0, 1.5, "b?"),
            Segment::stable(1.0, 1.8, "b"),
            Segment::stable(1.7, 2.0, "late dup"),
        ];
        for segment in &script {
            rec.apply(segment);
            assert!(rec.last_committed_end() >= previous);
            previous = rec.last_committed_end();
        }
        assert_eq!(rec.committed_text(), "a b");
    }
}
