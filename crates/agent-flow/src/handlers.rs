use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use browser_adapter::BrowserDriver;
use serde_json::{Map, Value};

use crate::errors::FlowError;
use crate::handoff::Handoff;
use crate::session::SessionQueues;

/// Site-specific multi-step routine invoked by `task` plan steps, e.g. a
/// guided registration flow or a status lookup.
///
/// Handlers get the handoff port because these flows routinely hit walls a
/// machine cannot pass (CAPTCHA images, OTP entry); the answer string the
/// user typed comes back to the handler.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Run one named method of the handler. Returned entries are merged into
    /// the plan's result accumulator.
    async fn run(
        &self,
        method: &str,
        params: &Map<String, Value>,
        driver: &dyn BrowserDriver,
        handoff: &dyn Handoff,
        queues: &mut SessionQueues,
    ) -> Result<Map<String, Value>, FlowError>;
}

/// Explicit handler lookup passed into the executor at construction.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Port for the `setup_profile` step: collect or update locally stored
/// profile facts outside the browser.
#[async_trait]
pub trait ProfileSetup: Send + Sync {
    async fn run_wizard(&self) -> Result<(), FlowError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::QueueHandoff;
    use crate::session::session_channel;
    use browser_adapter::ScriptedDriver;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl TaskHandler for EchoHandler {
        async fn run(
            &self,
            method: &str,
            _params: &Map<String, Value>,
            _driver: &dyn BrowserDriver,
            _handoff: &dyn Handoff,
            _queues: &mut SessionQueues,
        ) -> Result<Map<String, Value>, FlowError> {
            let mut out = Map::new();
            out.insert("method".to_string(), json!(method));
            Ok(out)
        }
    }

    #[tokio::test]
    async fn registry_dispatches_by_name() {
        let mut registry = HandlerRegistry::new();
        registry.register("grievance", Arc::new(EchoHandler));
        assert!(registry.get("missing").is_none());

        let handler = registry.get("grievance").unwrap();
        let driver = ScriptedDriver::new();
        let (_handle, mut queues) = session_channel();
        let out = handler
            .run("file_grievance", &Map::new(), &driver, &QueueHandoff, &mut queues)
            .await
            .unwrap();
        assert_eq!(out.get("method"), Some(&json!("file_grievance")));
    }
}
