use std::sync::Arc;

use agent_flow::AgentReply;
use formpilot_recipes::SiteRecipe;
use formpilot_registry::SessionRegistry;

use crate::config::AppConfig;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub(crate) struct ServeState {
    pub registry: Arc<SessionRegistry<AgentReply>>,
    pub recipe: Arc<SiteRecipe>,
    pub config: Arc<AppConfig>,
}

impl ServeState {
    pub fn new(recipe: Arc<SiteRecipe>, config: AppConfig) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            recipe,
            config: Arc::new(config),
        }
    }
}
