use thiserror::Error;

/// Errors emitted by decision providers. Parse failures never surface here;
/// they are coerced to `ReasoningDecision::AskUser` inside the provider.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("decision provider misconfigured: {0}")]
    Config(String),

    #[error("decision request failed: {0}")]
    Request(String),
}
