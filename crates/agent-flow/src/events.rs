use std::sync::Mutex;

use serde::Serialize;
use tracing::{error, info, warn};

/// Progress and diagnostic events emitted during plan execution.
///
/// Every step emits on both success and failure paths; sinks must never
/// block or fail the step they describe.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StepEvent {
    StepStarted {
        index: usize,
        total: usize,
        kind: String,
    },
    StepCompleted {
        index: usize,
        kind: String,
        after_recovery: bool,
        after_handoff: bool,
    },
    StepFailed {
        index: usize,
        kind: String,
        error: String,
    },
    RecoveryAttempted {
        index: usize,
        recovered: bool,
    },
    HandoffRequested {
        index: usize,
        reason: String,
    },
    LoopIteration {
        iteration: usize,
        cap: usize,
    },
    LoopYielded {
        question: String,
    },
    LoopFinished {
        state: String,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &StepEvent);
}

/// Default sink: structured log lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &StepEvent) {
        match event {
            StepEvent::StepStarted { index, total, kind } => {
                info!(step = index, total, kind, "step started")
            }
            StepEvent::StepCompleted {
                index,
                kind,
                after_recovery,
                after_handoff,
            } => info!(
                step = index,
                kind, after_recovery, after_handoff, "step complete"
            ),
            StepEvent::StepFailed { index, kind, error } => {
                error!(step = index, kind, error, "step failed")
            }
            StepEvent::RecoveryAttempted { index, recovered } => {
                warn!(step = index, recovered, "auto-recovery attempted")
            }
            StepEvent::HandoffRequested { index, reason } => {
                warn!(step = index, reason, "handing control to the user")
            }
            StepEvent::LoopIteration { iteration, cap } => {
                info!(iteration, cap, "reasoning iteration")
            }
            StepEvent::LoopYielded { question } => info!(question, "yielding to user"),
            StepEvent::LoopFinished { state } => info!(state, "reasoning loop finished"),
        }
    }
}

/// Test sink capturing every event in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StepEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StepEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, matcher: impl Fn(&StepEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| matcher(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &StepEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
