use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use whisper_relay::engine::{EngineFactory, SyntheticEngine};
use whisper_relay::server::{create_router, AppState};
use whisper_relay::session::SessionRegistry;
use whisper_relay::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = match Config::load("config/whisper-relay") {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!("No config file loaded ({}), using defaults", err);
            Config::default()
        }
    };

    info!("{} v0.1.0", cfg.service.name);
    info!(
        "Session idle timeout {}s, reaper interval {}s",
        cfg.session.idle_timeout_secs, cfg.session.reap_interval_secs
    );

    // Engine seam: the synthetic stand-in runs until a real model is
    // integrated behind StreamingEngine.
    let sample_rate = cfg.audio.sample_rate;
    let factory: EngineFactory =
        Arc::new(move || Box::new(SyntheticEngine::new(sample_rate, 1.0)));

    let registry = SessionRegistry::new(
        factory,
        Duration::from_secs(cfg.session.idle_timeout_secs),
    );
    let _reaper = registry.spawn_reaper(Duration::from_secs(cfg.session.reap_interval_secs));

    let app = create_router(AppState::new(Arc::clone(&registry)));
    let addr = format!("{}:{}", cfg.service.ws.bind, cfg.service.ws.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("WebSocket gateway listening on ws://{}/ws", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .context("Server error")?;

    Ok(())
}
