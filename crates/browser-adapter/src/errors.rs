use thiserror::Error;

/// Errors raised by browser driver primitives.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("selector not found: {selector}")]
    SelectorNotFound { selector: String },

    #[error("navigation timed out: {url}")]
    NavigationTimeout { url: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("driver internal error: {0}")]
    Internal(String),
}

impl DriverError {
    pub fn selector(selector: impl Into<String>) -> Self {
        Self::SelectorNotFound {
            selector: selector.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
