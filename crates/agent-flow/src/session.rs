use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::warn;

use crate::errors::FlowError;

/// Longest the core waits for a user answer before failing the operation.
pub const USER_INPUT_TIMEOUT: Duration = Duration::from_secs(300);

const QUEUE_CAPACITY: usize = 16;

/// One message from the core to the external caller.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentReply {
    RequiresInput {
        question: String,
        #[serde(default)]
        options: Vec<String>,
    },
    ReadyToSubmit {
        #[serde(default)]
        summary: BTreeMap<String, String>,
    },
    Success {
        #[serde(default)]
        results: Map<String, Value>,
    },
    Error {
        error: String,
    },
}

impl AgentReply {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentReply::Success { .. } | AgentReply::Error { .. })
    }
}

/// Caller-side ends: send user messages in, read agent replies out.
pub struct SessionHandle {
    pub input_tx: mpsc::Sender<String>,
    pub output_rx: mpsc::Receiver<AgentReply>,
}

/// Core-side ends, owned by the session worker. Single consumer of input,
/// single producer of output.
pub struct SessionQueues {
    input_rx: mpsc::Receiver<String>,
    output_tx: mpsc::Sender<AgentReply>,
}

/// Create the queue pair bridging one session's worker and its caller.
pub fn session_channel() -> (SessionHandle, SessionQueues) {
    let (input_tx, input_rx) = mpsc::channel(QUEUE_CAPACITY);
    let (output_tx, output_rx) = mpsc::channel(QUEUE_CAPACITY);
    (
        SessionHandle {
            input_tx,
            output_rx,
        },
        SessionQueues {
            input_rx,
            output_tx,
        },
    )
}

impl SessionQueues {
    /// Push a reply to the caller. A gone caller is logged, not fatal: the
    /// worker keeps winding down on its own.
    pub async fn push(&self, reply: AgentReply) {
        if self.output_tx.send(reply).await.is_err() {
            warn!("session output queue closed, dropping reply");
        }
    }

    /// Wait for the next user message, bounded by `wait`.
    pub async fn await_input(&mut self, wait: Duration) -> Result<String, FlowError> {
        match timeout(wait, self.input_rx.recv()).await {
            Ok(Some(answer)) => Ok(answer),
            Ok(None) => Err(FlowError::SessionClosed),
            Err(_) => Err(FlowError::UserInputTimeout(wait.as_secs())),
        }
    }
}
