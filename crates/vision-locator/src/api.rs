use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use formpilot_core_types::Viewport;
use thiserror::Error;

/// Center coordinates of a located element, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocatedPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("vision locator unavailable: {0}")]
    Unavailable(String),

    #[error("screenshot unreadable: {0}")]
    Screenshot(String),

    #[error("vision request failed: {0}")]
    Request(String),
}

/// Boundary to the vision model. `Ok(None)` means not found, which includes
/// any out-of-viewport answer the model produced.
#[async_trait]
pub trait VisualLocator: Send + Sync {
    async fn locate(
        &self,
        screenshot: &Path,
        description: &str,
        viewport: Viewport,
    ) -> Result<Option<LocatedPoint>, LocateError>;
}

/// Locator used when no vision backend is configured: everything is
/// not-found, so callers surface the failure instead of crashing.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledLocator;

#[async_trait]
impl VisualLocator for DisabledLocator {
    async fn locate(
        &self,
        _screenshot: &Path,
        _description: &str,
        _viewport: Viewport,
    ) -> Result<Option<LocatedPoint>, LocateError> {
        Ok(None)
    }
}

/// Deterministic locator for tests: pops queued answers in order, then
/// reports not-found.
#[derive(Default)]
pub struct MockLocator {
    queue: Mutex<Vec<Option<LocatedPoint>>>,
}

impl MockLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, answer: Option<LocatedPoint>) {
        self.queue.lock().unwrap().insert(0, answer);
    }
}

#[async_trait]
impl VisualLocator for MockLocator {
    async fn locate(
        &self,
        _screenshot: &Path,
        _description: &str,
        viewport: Viewport,
    ) -> Result<Option<LocatedPoint>, LocateError> {
        let answer = self.queue.lock().unwrap().pop().flatten();
        Ok(answer.filter(|p| viewport.contains(p.x, p.y)))
    }
}
