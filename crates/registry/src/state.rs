use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use formpilot_core_types::{IntentId, SessionId};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::model::SessionCtx;

/// Sessions idle longer than this are closed by the reaper.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(600);
/// How often the reaper scans for stale sessions.
pub const REAPER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Concurrent map of live sessions, generic over the worker's reply type.
pub struct SessionRegistry<O> {
    sessions: DashMap<SessionId, Arc<SessionCtx<O>>>,
    idle_ttl: Duration,
}

impl<O: Send + 'static> SessionRegistry<O> {
    pub fn new() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
        }
    }

    pub fn insert(
        &self,
        id: SessionId,
        intent: IntentId,
        input_tx: mpsc::Sender<String>,
        output_rx: mpsc::Receiver<O>,
    ) -> Arc<SessionCtx<O>> {
        let ctx = Arc::new(SessionCtx::new(intent, input_tx, output_rx));
        self.sessions.insert(id.clone(), Arc::clone(&ctx));
        debug!(session = %id, "session registered");
        ctx
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionCtx<O>>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Refresh a session's activity clock. Returns false for unknown ids.
    pub fn touch(&self, id: &SessionId) -> bool {
        match self.sessions.get(id) {
            Some(entry) => {
                entry.touch();
                true
            }
            None => false,
        }
    }

    /// Drop a session. Closing the input sender ends the worker's receive
    /// loop, which lets the worker task wind down on its own.
    pub fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            info!(session = %id, "session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove every session idle past the TTL, returning how many went.
    pub fn sweep_stale(&self) -> usize {
        let ttl = self.idle_ttl;
        let stale: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().idle_for() > ttl)
            .map(|entry| entry.key().clone())
            .collect();
        for id in &stale {
            info!(session = %id, "reaping idle session");
            self.sessions.remove(id);
        }
        stale.len()
    }

    /// Spawn the background reaper. Abort the returned handle on shutdown.
    pub fn spawn_reaper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(REAPER_SWEEP_INTERVAL);
            tick.tick().await;
            loop {
                tick.tick().await;
                let reaped = registry.sweep_stale();
                if reaped > 0 {
                    debug!(reaped, live = registry.len(), "reaper sweep complete");
                }
            }
        })
    }
}

impl<O: Send + 'static> Default for SessionRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session(registry: &SessionRegistry<String>, name: &str) -> SessionId {
        let (input_tx, _input_rx) = mpsc::channel(8);
        let (_output_tx, output_rx) = mpsc::channel(8);
        let id = SessionId::new();
        registry.insert(id.clone(), IntentId::from(name), input_tx, output_rx);
        id
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let registry: SessionRegistry<String> = SessionRegistry::new();
        let id = make_session(&registry, "apply_insurance");
        assert!(registry.get(&id).is_some());
        assert!(registry.touch(&id));
        assert!(registry.remove(&id));
        assert!(registry.get(&id).is_none());
        assert!(!registry.touch(&id));
    }

    #[tokio::test]
    async fn sweep_removes_only_stale_sessions() {
        let registry: SessionRegistry<String> = SessionRegistry::with_idle_ttl(Duration::ZERO);
        let stale = make_session(&registry, "check_status");
        // Anything idle past a zero TTL is stale immediately.
        std::thread::sleep(Duration::from_millis(5));
        let reaped = registry.sweep_stale();
        assert_eq!(reaped, 1);
        assert!(registry.get(&stale).is_none());
    }

    #[tokio::test]
    async fn touch_defers_reaping() {
        let registry: SessionRegistry<String> =
            SessionRegistry::with_idle_ttl(Duration::from_secs(3600));
        let id = make_session(&registry, "view_weather");
        registry.touch(&id);
        assert_eq!(registry.sweep_stale(), 0);
        assert!(registry.get(&id).is_some());
    }
}
