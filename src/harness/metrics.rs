use std::time::Duration;

use tokio::time::Instant;

/// Timing samples for one test round.
///
/// Unset fields stay `None` ("not yet observed") — representing them as
/// zero would fabricate a latency of zero.
#[derive(Debug, Clone, Default)]
pub struct RoundMetrics {
    /// When the first audio chunk was sent
    pub first_chunk_sent: Option<Instant>,

    /// When the first transcription-typed event arrived
    pub first_response: Option<Instant>,

    /// When the last audio chunk was sent
    pub last_chunk_sent: Option<Instant>,

    /// When the last final-marked event arrived
    pub final_response: Option<Instant>,

    /// Every event received this round
    pub received_responses: usize,
}

impl RoundMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// First-chunk-to-first-response latency, when both were observed.
    pub fn first_latency(&self) -> Option<Duration> {
        match (self.first_chunk_sent, self.first_response) {
            (Some(sent), Some(received)) => received.checked_duration_since(sent),
            _ => None,
        }
    }

    /// Last-chunk-to-final-response latency, when both were observed.
    pub fn final_latency(&self) -> Option<Duration> {
        match (self.last_chunk_sent, self.final_response) {
            (Some(sent), Some(received)) => received.checked_duration_since(sent),
            _ => None,
        }
    }
}

/// Everything one round produced.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub metrics: RoundMetrics,
    /// Text of the last final full transcription, if one arrived.
    pub final_text: Option<String>,
    /// Wall-clock duration of the round.
    pub wall_time: Duration,
    /// Duration of the replayed audio.
    pub audio_seconds: f64,
}

impl RoundReport {
    /// Real-time factor: wall-clock time over audio duration. Below 1.0
    /// means faster than real time.
    pub fn rtf(&self) -> Option<f64> {
        if self.audio_seconds > 0.0 {
            Some(self.wall_time.as_secs_f64() / self.audio_seconds)
        } else {
            None
        }
    }
}

/// Cross-round latency/throughput summary.
#[derive(Debug, Default)]
pub struct MetricsSummary {
    rounds: Vec<RoundReport>,
}

impl MetricsSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: RoundReport) {
        self.rounds.push(report);
    }

    pub fn rounds(&self) -> &[RoundReport] {
        &self.rounds
    }

    /// Render the per-round table plus the mean over the trailing rounds
    /// (warm rounds; the first round pays cold-start costs).
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<10} {:>14} {:>14} {:>8} {:>10}\n",
            "round", "first (s)", "final (s)", "RTF", "responses"
        ));

        for (i, report) in self.rounds.iter().enumerate() {
            out.push_str(&format!(
                "{:<10} {:>14} {:>14} {:>8} {:>10}\n",
                i + 1,
                fmt_latency(report.metrics.first_latency()),
                fmt_latency(report.metrics.final_latency()),
                report
                    .rtf()
                    .map(|r| format!("{:.2}", r))
                    .unwrap_or_else(|| "N/A".into()),
                report.metrics.received_responses,
            ));
        }

        if self.rounds.len() >= 3 {
            let tail = &self.rounds[self.rounds.len() - 3..];
            out.push_str(&format!(
                "{:<10} {:>14} {:>14} {:>8} {:>10}\n",
                "last-3",
                fmt_latency(mean_duration(tail.iter().map(|r| r.metrics.first_latency()))),
                fmt_latency(mean_duration(tail.iter().map(|r| r.metrics.final_latency()))),
                mean_f64(tail.iter().map(|r| r.rtf()))
                    .map(|r| format!("{:.2}", r))
                    .unwrap_or_else(|| "N/A".into()),
                format!(
                    "{:.1}",
                    tail.iter().map(|r| r.metrics.received_responses).sum::<usize>() as f64 / 3.0
                ),
            ));
        }

        out
    }
}

fn fmt_latency(latency: Option<Duration>) -> String {
    latency
        .map(|d| format!("{:.2}", d.as_secs_f64()))
        .unwrap_or_else(|| "N/A".into())
}

fn mean_duration(values: impl Iterator<Item = Option<Duration>>) -> Option<Duration> {
    let observed: Vec<Duration> = values.flatten().collect();
    if observed.is_empty() {
        return None;
    }
    Some(observed.iter().sum::<Duration>() / observed.len() as u32)
}

fn mean_f64(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let observed: Vec<f64> = values.flatten().collect();
    if observed.is_empty() {
        return None;
    }
    Some(observed.iter().sum::<f64>() / observed.len() as f64)
}
