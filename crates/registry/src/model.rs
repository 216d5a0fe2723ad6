use std::time::Instant;

use formpilot_core_types::IntentId;
use tokio::sync::{mpsc, Mutex};

/// Per-session context: the queue pair bridging the HTTP layer and the
/// session worker, plus bookkeeping for the idle reaper.
///
/// `output_rx` sits behind an async mutex because only one HTTP request may
/// drain a session's replies at a time.
pub struct SessionCtx<O> {
    pub intent: IntentId,
    pub input_tx: mpsc::Sender<String>,
    pub output_rx: Mutex<mpsc::Receiver<O>>,
    pub started_at: Instant,
    pub last_activity: parking_lot::Mutex<Instant>,
}

impl<O> SessionCtx<O> {
    pub fn new(intent: IntentId, input_tx: mpsc::Sender<String>, output_rx: mpsc::Receiver<O>) -> Self {
        let now = Instant::now();
        Self {
            intent,
            input_tx,
            output_rx: Mutex::new(output_rx),
            started_at: now,
            last_activity: parking_lot::Mutex::new(now),
        }
    }

    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.lock().elapsed()
    }
}
