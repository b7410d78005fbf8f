// Replay benchmark: stream a recorded WAV file through the gateway at
// real-time pace over several rounds and report first/final latency, RTF,
// and response counts.
//
// The audio must be 16 kHz mono; resampling is out of scope. Runs against
// an in-process connection with the synthetic stand-in engine, so no
// server or model needs to be up.
//
// Usage: cargo run --bin replay -- --audio path/to/recording.wav

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use whisper_relay::audio::AudioFile;
use whisper_relay::engine::{EngineFactory, SyntheticEngine};
use whisper_relay::harness::{run_rounds, RoundOptions};
use whisper_relay::session::SessionRegistry;

#[derive(Debug, Parser)]
#[command(name = "replay", about = "Multi-round streaming latency benchmark")]
struct Args {
    /// Path to a 16 kHz mono WAV file to replay
    #[arg(long)]
    audio: PathBuf,

    /// Number of test rounds
    #[arg(long, default_value_t = 4)]
    rounds: usize,

    /// Chunk size in seconds
    #[arg(long, default_value_t = 0.3)]
    chunk_size: f64,

    /// Pause between rounds in seconds
    #[arg(long, default_value_t = 5)]
    pause_secs: u64,

    /// Stand-in engine step in seconds of audio per stable segment
    #[arg(long, default_value_t = 1.0)]
    engine_step: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let samples = AudioFile::open(&args.audio)?.into_engine_samples()?;
    let audio_seconds = samples.len() as f64 / 16_000.0;
    info!(
        "Replaying {:.1}s of audio, {} round(s), {:.2}s chunks",
        audio_seconds, args.rounds, args.chunk_size
    );

    let step = args.engine_step;
    let factory: EngineFactory = Arc::new(move || Box::new(SyntheticEngine::new(16_000, step)));
    let registry = SessionRegistry::new(factory, Duration::from_secs(600));

    let opts = RoundOptions {
        chunk_seconds: args.chunk_size,
        ..RoundOptions::default()
    };

    let summary = run_rounds(
        registry,
        samples,
        args.rounds,
        opts,
        Duration::from_secs(args.pause_secs),
    )
    .await?;

    println!("\n{}", summary.render());

    for (i, report) in summary.rounds().iter().enumerate() {
        if let Some(text) = &report.final_text {
            info!("Round {} final transcript: {}", i + 1, text);
        }
    }

    Ok(())
}
