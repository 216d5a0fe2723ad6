use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::FlowError;
use crate::session::{AgentReply, SessionQueues, USER_INPUT_TIMEOUT};

/// Last-resort recovery: give the human the browser and wait for a go-ahead.
///
/// This is the only mechanism for CAPTCHA, OTP, and anything else the
/// automated paths cannot resolve; solving those automatically is out of
/// bounds by design choice, not by limitation.
#[async_trait]
pub trait Handoff: Send + Sync {
    async fn wait_for_continue(
        &self,
        queues: &mut SessionQueues,
        reason: &str,
    ) -> Result<String, FlowError>;
}

/// Interactive CLI handoff: blocking stdin read on a worker thread. This is
/// the one allowed unbounded wait in the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdinHandoff;

#[async_trait]
impl Handoff for StdinHandoff {
    async fn wait_for_continue(
        &self,
        _queues: &mut SessionQueues,
        reason: &str,
    ) -> Result<String, FlowError> {
        warn!("{reason}");
        eprintln!("\n{reason}\nType 'continue' and press Enter to resume.");
        let line = tokio::task::spawn_blocking(|| {
            let mut buf = String::new();
            std::io::stdin().read_line(&mut buf).map(|_| buf)
        })
        .await
        .map_err(|e| FlowError::Handler(format!("stdin reader task failed: {e}")))?
        .map_err(|e| FlowError::Handler(format!("stdin read failed: {e}")))?;
        let answer = line.trim().to_string();
        info!("user resumed execution");
        Ok(answer)
    }
}

/// Server-mode handoff: surface the reason as a question on the output queue
/// and wait (bounded) for the caller's answer.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueueHandoff;

#[async_trait]
impl Handoff for QueueHandoff {
    async fn wait_for_continue(
        &self,
        queues: &mut SessionQueues,
        reason: &str,
    ) -> Result<String, FlowError> {
        queues
            .push(AgentReply::RequiresInput {
                question: reason.to_string(),
                options: vec!["continue".to_string()],
            })
            .await;
        queues.await_input(USER_INPUT_TIMEOUT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::session_channel;

    #[tokio::test]
    async fn queue_handoff_asks_then_waits() {
        let (mut handle, mut queues) = session_channel();
        handle.input_tx.send("continue".to_string()).await.unwrap();

        let answer = QueueHandoff
            .wait_for_continue(&mut queues, "Step 2 (fill) failed")
            .await
            .unwrap();
        assert_eq!(answer, "continue");

        let asked = handle.output_rx.recv().await.unwrap();
        match asked {
            AgentReply::RequiresInput { question, options } => {
                assert!(question.contains("Step 2"));
                assert_eq!(options, vec!["continue".to_string()]);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}
