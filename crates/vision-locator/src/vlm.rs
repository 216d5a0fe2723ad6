use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use formpilot_core_types::Viewport;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::{LocateError, LocatedPoint, VisualLocator};
use crate::parse::parse_coordinates;

const COORD_PROMPT: &str = "You are a precise UI element locator. You will be shown a screenshot of a webpage.\n\
Your task: find the UI element that best matches the description and return its\n\
center pixel coordinates.\n\n\
Element to find: {description}\n\n\
Rules:\n\
1. Visually scan the page for the element.\n\
2. Return ONLY a single line in this exact format as your FINAL output:\n\
   COORDINATES: x,y\n\
   Where x = horizontal pixel, y = vertical pixel of the element center.\n\
3. If you cannot find the element, return:\n\
   COORDINATES: NOT_FOUND\n\
4. Do NOT include any other text after the COORDINATES line.";

/// Connection settings for the vision model endpoint (OpenAI-compatible
/// multimodal chat API).
#[derive(Clone, Debug)]
pub struct VlmLocatorConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl VlmLocatorConfig {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("VISION_API_KEY")
            .or_else(|_| std::env::var("LLM_API_KEY"))
            .ok()?;
        Some(Self {
            api_key,
            model: std::env::var("VISION_MODEL_ID")
                .unwrap_or_else(|_| "meta/llama-4-maverick-17b-128e-instruct".to_string()),
            api_base: std::env::var("VISION_API_URL")
                .unwrap_or_else(|_| "https://integrate.api.nvidia.com/v1".to_string()),
            timeout: Duration::from_secs(60),
        })
    }
}

pub struct VlmLocator {
    client: Client,
    config: VlmLocatorConfig,
}

impl VlmLocator {
    pub fn new(config: VlmLocatorConfig) -> Result<Self, LocateError> {
        if config.api_key.is_empty() {
            return Err(LocateError::Unavailable("missing vision API key".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LocateError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
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
impl VisualLocator for VlmLocator {
    async fn locate(
        &self,
        screenshot: &Path,
        description: &str,
        viewport: Viewport,
    ) -> Result<Option<LocatedPoint>, LocateError> {
        info!(description, "vision fallback activated");

        let bytes = tokio::fs::read(screenshot)
            .await
            .map_err(|e| LocateError::Screenshot(format!("{}: {e}", screenshot.display())))?;
        let image_b64 = BASE64.encode(bytes);

        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let prompt = COORD_PROMPT.replace("{description}", description);
        let body = json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "image_url",
                     "image_url": {"url": format!("data:image/png;base64,{image_b64}")}},
                    {"type": "text", "text": prompt}
                ]
            }],
            "max_tokens": 512,
            "temperature": 0.1,
            "top_p": 0.9
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LocateError::Request(format!("vlm request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(LocateError::Request(format!("vlm returned {status}: {text}")));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LocateError::Request(format!("vlm response invalid: {e}")))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        debug!(raw = %content.chars().take(200).collect::<String>(), "vlm answer");

        let Some((x, y)) = parse_coordinates(&content) else {
            warn!(description, "vision model could not locate element");
            return Ok(None);
        };

        if !viewport.contains(x, y) {
            warn!(
                x, y,
                width = viewport.width,
                height = viewport.height,
                "vision model returned out-of-bounds coordinates, discarding"
            );
            return Ok(None);
        }

        info!(description, x, y, "element located visually");
        Ok(Some(LocatedPoint { x, y }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockLocator;

    #[tokio::test]
    async fn mock_discards_out_of_viewport_points() {
        let locator = MockLocator::new();
        locator.push(Some(LocatedPoint { x: 5000.0, y: 10.0 }));
        let result = locator
            .locate(Path::new("unused.png"), "submit button", Viewport::new(1280, 900))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn mock_passes_in_viewport_points() {
        let locator = MockLocator::new();
        locator.push(Some(LocatedPoint { x: 640.0, y: 330.0 }));
        let result = locator
            .locate(Path::new("unused.png"), "submit button", Viewport::new(1280, 900))
            .await
            .unwrap();
        assert_eq!(result, Some(LocatedPoint { x: 640.0, y: 330.0 }));
    }
}
