use std::sync::Arc;

use agent_flow::{
    build_plan, builtin_handlers, AgentReply, FlowError, Navigator, QueueHandoff, SessionQueues,
    StepExecutor, TracingSink,
};
use browser_adapter::{BrowserDriver, ChromeDriver, ChromeDriverConfig};
use decision_engine::{
    DecisionProvider, OpenAiDecisionConfig, OpenAiDecisionProvider, UnconfiguredProvider,
};
use formpilot_core_types::IntentId;
use formpilot_recipes::{SiteRecipe, Sitemap};
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use vision_locator::{DisabledLocator, VisualLocator, VlmLocator, VlmLocatorConfig};

use crate::config::AppConfig;

/// Everything a session worker needs to run one plan end to end.
pub(crate) struct SessionSpec {
    pub intent: String,
    pub params: Map<String, Value>,
    pub profile: Map<String, Value>,
    pub headless: bool,
    pub recipe: Arc<SiteRecipe>,
    pub config: Arc<AppConfig>,
}

/// One session's worker task. Owns the browser and the core-side queue
/// ends; every outcome, success or failure, lands on the output queue so
/// the caller never has to poll task state.
pub(crate) async fn run_session(spec: SessionSpec, mut queues: SessionQueues) {
    let intent = spec.intent.clone();
    info!(intent, "session worker starting");

    let handlers = builtin_handlers();
    let plan = build_plan(&spec.recipe, &intent, &spec.params, &handlers);
    let form_hint = spec.recipe.form_hint(&intent).map(str::to_string);
    let sitemap = Arc::new(Sitemap::new(spec.recipe.as_ref().clone()));

    let driver_config = ChromeDriverConfig {
        headless: spec.headless,
        screenshots_dir: spec.config.screenshots_dir.clone(),
        ..Default::default()
    };
    let driver: Arc<dyn BrowserDriver> =
        match tokio::task::spawn_blocking(move || ChromeDriver::launch(driver_config)).await {
            Ok(Ok(driver)) => Arc::new(driver),
            Ok(Err(e)) => {
                error!(error = %e, "browser launch failed");
                queues
                    .push(AgentReply::Error {
                        error: format!("browser launch failed: {e}"),
                    })
                    .await;
                return;
            }
            Err(e) => {
                error!(error = %e, "browser launch task panicked");
                queues
                    .push(AgentReply::Error {
                        error: "browser launch failed".into(),
                    })
                    .await;
                return;
            }
        };

    let mut executor = StepExecutor::new(
        driver,
        Navigator::new(sitemap, IntentId::from(intent.as_str())),
        handlers,
        Arc::new(QueueHandoff),
        decision_provider(),
        visual_locator(),
        Arc::new(TracingSink),
        IntentId::from(intent.as_str()),
    )
    .with_form_hint(form_hint);

    match executor.execute(&plan, spec.profile, &mut queues).await {
        Ok(results) => {
            info!(intent, "session worker finished");
            queues
                .push(AgentReply::Success {
                    results: results.into_map(),
                })
                .await;
        }
        // The reasoning loop reports its own exhaustion before bailing out.
        Err(FlowError::IterationLimitExceeded(_)) => {
            warn!(intent, "session ended at the iteration cap");
        }
        Err(e) => {
            error!(intent, error = %e, "session worker failed");
            queues
                .push(AgentReply::Error {
                    error: e.to_string(),
                })
                .await;
        }
    }
}

/// Live decision provider when `LLM_API_KEY` is present; otherwise every
/// form question is routed straight to the user.
pub(crate) fn decision_provider() -> Arc<dyn DecisionProvider> {
    match OpenAiDecisionConfig::from_env() {
        Some(config) => match OpenAiDecisionProvider::new(config) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                warn!(error = %e, "decision provider init failed, falling back to ask-user");
                Arc::new(UnconfiguredProvider)
            }
        },
        None => {
            warn!("LLM_API_KEY not set, form questions go straight to the user");
            Arc::new(UnconfiguredProvider)
        }
    }
}

/// Vision-model locator when `VISION_API_KEY` is present; otherwise the
/// vision fallback reports not-found and failures surface normally.
pub(crate) fn visual_locator() -> Arc<dyn VisualLocator> {
    match VlmLocatorConfig::from_env() {
        Some(config) => match VlmLocator::new(config) {
            Ok(locator) => Arc::new(locator),
            Err(e) => {
                warn!(error = %e, "vision locator init failed, vision fallback disabled");
                Arc::new(DisabledLocator)
            }
        },
        None => Arc::new(DisabledLocator),
    }
}
