use browser_adapter::DriverError;
use thiserror::Error;

/// Failures that can surface from plan execution.
///
/// Driver errors inside a deterministic step are first routed through the
/// recover-retry-handoff chain; only after that chain is exhausted do they
/// propagate out of `execute`.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("no user response within {0} seconds")]
    UserInputTimeout(u64),

    #[error("reasoning loop exceeded {0} iterations")]
    IterationLimitExceeded(usize),

    #[error("visual locate failed: {0}")]
    VisualLocateFailed(String),

    #[error("task handler failed: {0}")]
    Handler(String),

    #[error("session closed by caller")]
    SessionClosed,

    #[error("submission failed: {0}")]
    Submission(String),
}
