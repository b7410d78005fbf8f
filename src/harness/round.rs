use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tokio::sync::{Mutex, Notify};
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

use super::metrics::{RoundMetrics, RoundReport};
use crate::audio::encode_base64_pcm;
use crate::harness::MetricsSummary;
use crate::proto::{ClientCommand, ServerEvent};
use crate::server::spawn_connection;
use crate::session::SessionRegistry;

/// Pacing and timeout knobs for one round. Every blocking receive in the
/// harness is bounded by one of these; a timeout is reported, never fatal.
#[derive(Debug, Clone)]
pub struct RoundOptions {
    /// Seconds of audio per chunk
    pub chunk_seconds: f64,
    /// Sample rate of the replayed audio
    pub sample_rate: u32,
    /// Upper bound on each blocking receive in the drainer
    pub recv_timeout: Duration,
    /// How long the pacer waits after the last chunk for a first response
    pub first_response_wait: Duration,
    /// Bound on the post-cancellation cleanup drain
    pub drain_timeout: Duration,
    /// Session handshake attempts before giving up
    pub connect_attempts: usize,
    /// Fixed backoff between handshake attempts
    pub connect_backoff: Duration,
}

impl Default for RoundOptions {
    fn default() -> Self {
        Self {
            chunk_seconds: 0.3,
            sample_rate: 16_000,
            recv_timeout: Duration::from_millis(500),
            first_response_wait: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(2),
            connect_attempts: 3,
            connect_backoff: Duration::from_millis(500),
        }
    }
}

/// Mutable state shared between pacer and drainer: append-only metric
/// fields plus the captured final transcript. Nothing else is shared.
#[derive(Default)]
struct DrainState {
    metrics: RoundMetrics,
    final_text: Option<String>,
}

/// Run one complete round against a connection's duplex channel: start a
/// session, pace the audio out in real time, then finalize and drain.
pub async fn run_round(
    command_tx: mpsc::Sender<ClientCommand>,
    mut event_rx: mpsc::Receiver<ServerEvent>,
    samples: Vec<f32>,
    opts: RoundOptions,
) -> Result<RoundReport> {
    let round_start = Instant::now();
    let audio_seconds = samples.len() as f64 / opts.sample_rate as f64;

    let state = Arc::new(Mutex::new(DrainState::default()));

    // Handshake before the drainer exists: capped retry, fixed backoff.
    let session_id = start_session_with_retry(&command_tx, &mut event_rx, &state, &opts).await?;
    info!("Round session started: {}", session_id);

    // First-response latch: the flag is what the pacer checks, the notify
    // is how it waits without polling.
    let first_seen = Arc::new(AtomicBool::new(false));
    let first_notify = Arc::new(Notify::new());
    let stop = Arc::new(AtomicBool::new(false));

    let drainer = tokio::spawn(drain_events(
        event_rx,
        Arc::clone(&state),
        Arc::clone(&stop),
        Arc::clone(&first_seen),
        Arc::clone(&first_notify),
        opts.clone(),
    ));

    // Pacer: chunk i is sent no earlier than round_start + offset(i)/rate.
    // Never early; late under load is accepted (models live capture).
    let chunk_samples = ((opts.chunk_seconds * opts.sample_rate as f64) as usize).max(1);
    for (index, chunk) in samples.chunks(chunk_samples).enumerate() {
        let offset_seconds = (index * chunk_samples) as f64 / opts.sample_rate as f64;
        sleep_until(round_start + Duration::from_secs_f64(offset_seconds)).await;

        let payload = encode_base64_pcm(chunk);
        let now = Instant::now();
        {
            let mut state = state.lock().await;
            state.metrics.first_chunk_sent.get_or_insert(now);
            state.metrics.last_chunk_sent = Some(now);
        }
        command_tx
            .send(ClientCommand::ProcessAudio { audio: payload })
            .await
            .context("Connection closed while streaming audio")?;
    }

    // Optionally wait (bounded) for the first response, so the round is
    // not declared over before the server ever spoke.
    if !first_seen.load(Ordering::Relaxed) {
        if timeout(opts.first_response_wait, first_notify.notified())
            .await
            .is_err()
        {
            warn!(
                "No transcription response within {:?} of the last chunk",
                opts.first_response_wait
            );
        }
    }

    command_tx
        .send(ClientCommand::EndSession)
        .await
        .context("Connection closed before end_session")?;

    // Cooperative cancellation: the drainer switches to its bounded
    // cleanup drain and exits on its own.
    stop.store(true, Ordering::Relaxed);

    let join_bound = opts.drain_timeout + opts.recv_timeout + Duration::from_secs(1);
    match timeout(join_bound, drainer).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!("Drainer task panicked: {}", err),
        Err(_) => warn!("Drainer did not settle within {:?}", join_bound),
    }

    let state = state.lock().await;
    Ok(RoundReport {
        metrics: state.metrics.clone(),
        final_text: state.final_text.clone(),
        wall_time: round_start.elapsed(),
        audio_seconds,
    })
}

/// Run `rounds` rounds over fresh connections to the same registry, with a
/// fixed pause between rounds, and collect the summary.
pub async fn run_rounds(
    registry: Arc<SessionRegistry>,
    samples: Vec<f32>,
    rounds: usize,
    opts: RoundOptions,
    pause: Duration,
) -> Result<MetricsSummary> {
    let mut summary = MetricsSummary::new();

    for round in 1..=rounds {
        info!("Starting round {}/{}", round, rounds);
        let (command_tx, event_rx) = spawn_connection(Arc::clone(&registry));
        let report = run_round(command_tx, event_rx, samples.clone(), opts.clone()).await?;
        info!(
            "Round {} complete: {} responses in {:.2}s",
            round,
            report.metrics.received_responses,
            report.wall_time.as_secs_f64()
        );
        summary.push(report);

        if round < rounds {
            sleep(pause).await;
        }
    }

    Ok(summary)
}

async fn start_session_with_retry(
    command_tx: &mpsc::Sender<ClientCommand>,
    event_rx: &mut mpsc::Receiver<ServerEvent>,
    state: &Arc<Mutex<DrainState>>,
    opts: &RoundOptions,
) -> Result<String> {
    for attempt in 1..=opts.connect_attempts {
        command_tx
            .send(ClientCommand::StartSession { session_id: None })
            .await
            .context("Connection closed during handshake")?;

        // Consume events until session_started or the attempt times out.
        let deadline = Instant::now() + opts.recv_timeout.max(Duration::from_secs(1));
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match timeout(remaining, event_rx.recv()).await {
                Ok(Some(event)) => {
                    let mut state = state.lock().await;
                    state.metrics.received_responses += 1;
                    match event {
                        ServerEvent::SessionStarted { session_id } => return Ok(session_id),
                        ServerEvent::Error { message } => {
                            warn!("Handshake error event: {}", message);
                        }
                        other => debug!("Ignoring pre-session event: {:?}", other),
                    }
                }
                Ok(None) => bail!("Connection closed during handshake"),
                Err(_) => break,
            }
        }

        if attempt < opts.connect_attempts {
            warn!(
                "No session_started (attempt {}/{}), retrying in {:?}",
                attempt, opts.connect_attempts, opts.connect_backoff
            );
            sleep(opts.connect_backoff).await;
        }
    }

    bail!(
        "Session handshake failed after {} attempts",
        opts.connect_attempts
    )
}

/// Receive loop: timestamps the first transcription-typed event and every
/// final-marked one, counts everything, and after cancellation keeps
/// consuming briefly so in-flight final messages are not lost.
async fn drain_events(
    mut event_rx: mpsc::Receiver<ServerEvent>,
    state: Arc<Mutex<DrainState>>,
    stop: Arc<AtomicBool>,
    first_seen: Arc<AtomicBool>,
    first_notify: Arc<Notify>,
    opts: RoundOptions,
) {
    // Normal phase: runs until the pacer raises the stop flag or the
    // terminal event arrives.
    loop {
        match timeout(opts.recv_timeout, event_rx.recv()).await {
            Ok(Some(event)) => {
                let ended = record_event(&state, &first_seen, &first_notify, event).await;
                if ended && stop.load(Ordering::Relaxed) {
                    return;
                }
            }
            Ok(None) => return,
            Err(_) => {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
    }

    // Bounded cleanup drain after cancellation.
    let deadline = Instant::now() + opts.drain_timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!("Cleanup drain timed out after {:?}", opts.drain_timeout);
            return;
        }
        match timeout(remaining.min(opts.recv_timeout), event_rx.recv()).await {
            Ok(Some(event)) => {
                if record_event(&state, &first_seen, &first_notify, event).await {
                    return;
                }
            }
            Ok(None) => return,
            Err(_) => {}
        }
    }
}

/// Record one event into the shared metrics. Returns true for the terminal
/// session_ended event.
async fn record_event(
    state: &Arc<Mutex<DrainState>>,
    first_seen: &AtomicBool,
    first_notify: &Notify,
    event: ServerEvent,
) -> bool {
    let now = Instant::now();
    let mut state = state.lock().await;
    state.metrics.received_responses += 1;

    if event.is_transcription() {
        if state.metrics.first_response.is_none() {
            state.metrics.first_response = Some(now);
        }
        if !first_seen.swap(true, Ordering::Relaxed) {
            first_notify.notify_one();
        }
    }

    if event.is_final() {
        state.metrics.final_response = Some(now);
    }

    match event {
        ServerEvent::FullTranscription {
            text,
            is_final: true,
        } => {
            state.final_text = Some(text);
            false
        }
        ServerEvent::Error { message } => {
            warn!("Server error event: {}", message);
            false
        }
        ServerEvent::SessionEnded { session_id } => {
            debug!("Session ended: {}", session_id);
            true
        }
        _ => false,
    }
}
