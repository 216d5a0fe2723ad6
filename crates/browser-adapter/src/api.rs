use std::path::PathBuf;

use async_trait::async_trait;
use formpilot_core_types::Viewport;
use serde_json::Value;

use crate::errors::DriverError;

/// How a `<select>` option should be matched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectTarget {
    pub value: Option<String>,
    pub label: Option<String>,
}

impl SelectTarget {
    pub fn by_label(label: impl Into<String>) -> Self {
        Self {
            value: None,
            label: Some(label.into()),
        }
    }

    /// A single string coming from a decision service maps to both matchers:
    /// the driver tries value first, then falls back to label text.
    pub fn fuzzy(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            value: Some(text.clone()),
            label: Some(text),
        }
    }
}

/// Primitive browser operations. All calls are async and may fail with a
/// timeout or not-found error; higher layers own retry and recovery policy.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError>;

    async fn select_option(
        &self,
        selector: &str,
        target: &SelectTarget,
    ) -> Result<(), DriverError>;

    /// Capture a viewport screenshot and return the path it was written to.
    async fn screenshot(&self, name: &str) -> Result<PathBuf, DriverError>;

    async fn get_text(&self, selector: &str) -> Result<String, DriverError>;

    /// Evaluate a JS expression in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<Value, DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    fn viewport(&self) -> Viewport;

    /// Click at a viewport coordinate. Used only by the vision fallback path.
    async fn click_at(&self, x: f64, y: f64) -> Result<(), DriverError>;

    /// Type text into the currently focused element.
    async fn type_text(&self, text: &str) -> Result<(), DriverError>;

    async fn press_key(&self, key: &str) -> Result<(), DriverError>;
}
