use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::DecisionError;
use crate::model::{DecisionContext, ReasoningDecision};
use crate::parse::decode_decision;
use crate::prompt::{build_system_prompt, build_user_message};

/// Boundary to the decision service.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn decide(&self, ctx: &DecisionContext<'_>) -> Result<ReasoningDecision, DecisionError>;
}

/// Connection settings for an OpenAI-compatible chat completion endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiDecisionConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl OpenAiDecisionConfig {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("LLM_API_KEY").ok()?;
        Some(Self {
            api_key,
            model: std::env::var("LLM_MODEL_ID").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_base: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        })
    }
}

pub struct OpenAiDecisionProvider {
    client: Client,
    config: OpenAiDecisionConfig,
}

impl OpenAiDecisionProvider {
    pub fn new(config: OpenAiDecisionConfig) -> Result<Self, DecisionError> {
        if config.api_key.is_empty() {
            return Err(DecisionError::Config("missing decision API key".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DecisionError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl DecisionProvider for OpenAiDecisionProvider {
    async fn decide(&self, ctx: &DecisionContext<'_>) -> Result<ReasoningDecision, DecisionError> {
        info!(
            intent = %ctx.intent,
            elements = ctx.snapshot.len(),
            "evaluating DOM state"
        );

        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: 1024,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: build_system_prompt(ctx),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_user_message(ctx),
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DecisionError::Request(format!("decision request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(DecisionError::Request(format!(
                "decision service returned {status}: {text}"
            )));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| DecisionError::Request(format!("decision response invalid: {e}")))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        debug!(raw = %content.chars().take(400).collect::<String>(), "decision raw response");

        // Parse failures coerce, they never error.
        Ok(decode_decision(&content))
    }
}

/// Provider used when no decision service is configured. Every call fails
/// with a config error, which callers coerce into asking the user.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredProvider;

#[async_trait]
impl DecisionProvider for UnconfiguredProvider {
    async fn decide(&self, _ctx: &DecisionContext<'_>) -> Result<ReasoningDecision, DecisionError> {
        Err(DecisionError::Config(
            "no decision service configured (set LLM_API_KEY)".into(),
        ))
    }
}

/// Deterministic provider for tests and offline development: pops queued
/// decisions in order, then keeps answering READY_TO_SUBMIT.
#[derive(Default)]
pub struct MockDecisionProvider {
    queue: Mutex<Vec<ReasoningDecision>>,
}

impl MockDecisionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decisions(decisions: Vec<ReasoningDecision>) -> Self {
        let mut queue = decisions;
        queue.reverse();
        Self {
            queue: Mutex::new(queue),
        }
    }

    pub fn push(&self, decision: ReasoningDecision) {
        self.queue.lock().unwrap().insert(0, decision);
    }
}

#[async_trait]
impl DecisionProvider for MockDecisionProvider {
    async fn decide(&self, _ctx: &DecisionContext<'_>) -> Result<ReasoningDecision, DecisionError> {
        let next = self.queue.lock().unwrap().pop();
        Ok(next.unwrap_or(ReasoningDecision::ReadyToSubmit {
            summary: Default::default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_core_types::IntentId;
    use perceiver_dom::DomSnapshot;
    use serde_json::{json, Map};

    fn ctx_parts() -> (IntentId, DomSnapshot, serde_json::Value, Map<String, serde_json::Value>) {
        (
            IntentId::from("apply_insurance"),
            DomSnapshot::empty(),
            json!({"action": "agentic_loop"}),
            Map::new(),
        )
    }

    #[tokio::test]
    async fn mock_provider_pops_in_order() {
        let provider = MockDecisionProvider::with_decisions(vec![
            ReasoningDecision::AskUser {
                question: "Pick a season".into(),
                options: vec!["Kharif".into(), "Rabi".into()],
            },
            ReasoningDecision::ReadyToSubmit {
                summary: Default::default(),
            },
        ]);
        let (intent, snapshot, step, profile) = ctx_parts();
        let ctx = DecisionContext {
            intent: &intent,
            snapshot: &snapshot,
            step: &step,
            profile: &profile,
            form_hint: None,
        };
        assert!(matches!(
            provider.decide(&ctx).await.unwrap(),
            ReasoningDecision::AskUser { .. }
        ));
        assert!(matches!(
            provider.decide(&ctx).await.unwrap(),
            ReasoningDecision::ReadyToSubmit { .. }
        ));
        // Exhausted queue keeps answering ready-to-submit.
        assert!(matches!(
            provider.decide(&ctx).await.unwrap(),
            ReasoningDecision::ReadyToSubmit { .. }
        ));
    }
}
