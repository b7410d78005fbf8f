use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::session::Session;
use super::stats::SessionStats;
use crate::engine::EngineFactory;
use crate::errors::RelayError;
use crate::proto::ServerEvent;

/// Owns the session_id → session map.
///
/// The map sits behind an `RwLock`; each session behind its own `Mutex`.
/// Operations on the same id are serialized by the session lock while
/// different ids proceed independently. Map locks are held only long
/// enough to clone the session handle out.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    engine_factory: EngineFactory,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(engine_factory: EngineFactory, idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            engine_factory,
            idle_timeout,
        })
    }

    /// Create a session with a fresh engine handle and zeroed reconciler
    /// state. When no id is supplied one is generated; uniqueness of
    /// generated ids is probabilistic, not cryptographically guaranteed.
    pub async fn create(&self, session_id: Option<String>) -> Result<String, RelayError> {
        let session_id =
            session_id.unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session_id) {
            return Err(RelayError::Protocol(format!(
                "session '{}' already active",
                session_id
            )));
        }

        let engine = (self.engine_factory)();
        sessions.insert(
            session_id.clone(),
            Arc::new(Mutex::new(Session::new(session_id.clone(), engine))),
        );

        info!("Session registered: {} ({} active)", session_id, sessions.len());

        Ok(session_id)
    }

    /// Feed one audio chunk into a session and return the resulting
    /// outbound events in generation order.
    pub async fn feed(
        &self,
        session_id: &str,
        samples: &[f32],
    ) -> Result<Vec<ServerEvent>, RelayError> {
        let session = self.get(session_id).await?;
        let mut session = session.lock().await;
        session.feed(samples)
    }

    /// Finalize and destroy a session.
    ///
    /// The entry is removed from the map before the engine is drained, so a
    /// second finalize (or a feed racing with this one) fails cleanly with
    /// `SessionNotFound` instead of observing a half-dead session.
    pub async fn finalize(&self, session_id: &str) -> Result<Vec<ServerEvent>, RelayError> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(session_id)
                .ok_or_else(|| RelayError::SessionNotFound(session_id.to_string()))?
        };

        let mut session = session.lock().await;
        session.finalize()
    }

    /// Remove every session idle beyond the threshold, without finalizing:
    /// the client is presumed gone and buffered speculative text is lost by
    /// design. Returns the number of evicted sessions.
    pub async fn evict_idle(&self) -> usize {
        let candidates: Vec<(String, Arc<Mutex<Session>>)> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .map(|(id, session)| (id.clone(), Arc::clone(session)))
                .collect()
        };

        let mut stale = Vec::new();
        for (id, session) in candidates {
            let session = session.lock().await;
            if session.idle_for() > self.idle_timeout {
                stale.push(id);
            }
        }

        if stale.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        let mut evicted = 0;
        for id in stale {
            // A session may have resumed or been finalized since the scan;
            // removal only applies to entries still present.
            if sessions.remove(&id).is_some() {
                warn!("Evicting idle session: {}", id);
                evicted += 1;
            }
        }
        evicted
    }

    /// Spawn the background reaper: wakes on a fixed interval and evicts
    /// whatever it observes to be stale at that instant.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            info!(
                "Idle reaper started (interval {:?}, threshold {:?})",
                interval, registry.idle_timeout
            );
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = registry.evict_idle().await;
                if evicted > 0 {
                    info!("Idle reaper evicted {} session(s)", evicted);
                } else {
                    debug!("Idle reaper scan: nothing stale");
                }
            }
        })
    }

    pub async fn stats(&self, session_id: &str) -> Result<SessionStats, RelayError> {
        let session = self.get(session_id).await?;
        let session = session.lock().await;
        Ok(session.stats())
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn get(&self, session_id: &str) -> Result<Arc<Mutex<Session>>, RelayError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| RelayError::SessionNotFound(session_id.to_string()))
    }
}
