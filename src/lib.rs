pub mod audio;
pub mod config;
pub mod engine;
pub mod errors;
pub mod harness;
pub mod proto;
pub mod server;
pub mod session;
pub mod transcript;

pub use audio::{decode_base64_pcm, encode_base64_pcm, AudioFile};
pub use config::Config;
pub use engine::{EngineFactory, ScriptedCue, ScriptedEngine, StreamingEngine, SyntheticEngine};
pub use errors::RelayError;
pub use harness::{MetricsSummary, RoundMetrics, RoundOptions, RoundReport};
pub use proto::{ClientCommand, ServerEvent, TranscriptionStatus};
pub use server::{create_router, spawn_connection, AppState, Connection};
pub use session::{Session, SessionRegistry, SessionStats};
pub use transcript::{Applied, Reconciler, Segment, SegmentKind};
