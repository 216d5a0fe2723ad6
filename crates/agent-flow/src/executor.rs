use std::sync::Arc;
use std::time::Duration;

use browser_adapter::{page_ops, BrowserDriver, SelectTarget};
use decision_engine::DecisionProvider;
use formpilot_core_types::IntentId;
use serde_json::{json, Map, Value};
use tokio::time::sleep;
use tracing::{info, warn};
use vision_locator::VisualLocator;

use crate::errors::FlowError;
use crate::events::{EventSink, StepEvent};
use crate::fallback;
use crate::handlers::{HandlerRegistry, ProfileSetup};
use crate::handoff::Handoff;
use crate::navigator::Navigator;
use crate::plan::{ActionStep, ExecutionPlan};
use crate::reasoning::{LoopConfig, ReasoningLoop};
use crate::results::ResultAccumulator;
use crate::session::SessionQueues;

const PAGE_INFO_JS: &str =
    r#"(function () { return { title: document.title, url: location.href }; })()"#;

const HEADINGS_JS: &str = r#"
(function () {
  return Array.from(document.querySelectorAll("h1, h2, h3"))
    .map(h => h.innerText.trim())
    .filter(t => t.length > 0)
    .slice(0, 15);
})()
"#;

#[derive(Clone, Debug, Default)]
pub struct StepExecutorConfig {
    pub loop_config: LoopConfig,
}

/// Top-level plan driver.
///
/// Deterministic steps dispatch straight to the browser; each failure runs
/// the bounded chain of diagnostic screenshot, recovery plus one retry, and
/// human handoff plus one final retry. The `agentic_loop` step is handed to
/// the [`ReasoningLoop`], which owns its own failure policy.
pub struct StepExecutor {
    driver: Arc<dyn BrowserDriver>,
    navigator: Navigator,
    handlers: HandlerRegistry,
    handoff: Arc<dyn Handoff>,
    decider: Arc<dyn DecisionProvider>,
    locator: Arc<dyn VisualLocator>,
    events: Arc<dyn EventSink>,
    profile_setup: Option<Arc<dyn ProfileSetup>>,
    intent: IntentId,
    form_hint: Option<String>,
    config: StepExecutorConfig,
    results: ResultAccumulator,
}

impl StepExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        navigator: Navigator,
        handlers: HandlerRegistry,
        handoff: Arc<dyn Handoff>,
        decider: Arc<dyn DecisionProvider>,
        locator: Arc<dyn VisualLocator>,
        events: Arc<dyn EventSink>,
        intent: IntentId,
    ) -> Self {
        Self {
            driver,
            navigator,
            handlers,
            handoff,
            decider,
            locator,
            events,
            profile_setup: None,
            intent,
            form_hint: None,
            config: StepExecutorConfig::default(),
            results: ResultAccumulator::new(),
        }
    }

    pub fn with_profile_setup(mut self, setup: Arc<dyn ProfileSetup>) -> Self {
        self.profile_setup = Some(setup);
        self
    }

    pub fn with_form_hint(mut self, hint: Option<String>) -> Self {
        self.form_hint = hint;
        self
    }

    pub fn with_config(mut self, config: StepExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the plan to completion. Fails only after a step has exhausted
    /// recovery and handoff, or when the reasoning loop fails terminally;
    /// the plan is never resumed past a failed step.
    pub async fn execute(
        &mut self,
        plan: &ExecutionPlan,
        mut profile: Map<String, Value>,
        queues: &mut SessionQueues,
    ) -> Result<ResultAccumulator, FlowError> {
        let total = plan.len();
        for (i, step) in plan.steps.iter().enumerate() {
            let index = i + 1;
            let kind = step.kind();
            self.events.emit(&StepEvent::StepStarted {
                index,
                total,
                kind: kind.to_string(),
            });

            if matches!(step, ActionStep::AgenticLoop { .. }) {
                self.run_reasoning(step, &mut profile, queues, index).await?;
                continue;
            }

            match self.run_step(step, &profile, queues).await {
                Ok(()) => {
                    self.emit_completed(index, kind, false, false);
                    continue;
                }
                Err(err) => {
                    self.events.emit(&StepEvent::StepFailed {
                        index,
                        kind: kind.to_string(),
                        error: err.to_string(),
                    });

                    // Best-effort diagnostic screenshot; its own failure is
                    // swallowed.
                    if let Err(shot_err) = self
                        .driver
                        .screenshot(&format!("error_step_{index}_{kind}"))
                        .await
                    {
                        warn!(%shot_err, "diagnostic screenshot failed");
                    }

                    let recovered = self
                        .navigator
                        .recover(self.driver.as_ref(), &err.to_string())
                        .await;
                    self.events
                        .emit(&StepEvent::RecoveryAttempted { index, recovered });

                    if recovered {
                        match self.run_step(step, &profile, queues).await {
                            Ok(()) => {
                                self.emit_completed(index, kind, true, false);
                                continue;
                            }
                            Err(retry_err) => {
                                warn!(%retry_err, step = index, "retry after recovery failed")
                            }
                        }
                    }

                    let mut reason = format!(
                        "Step {index} ({kind}) failed and auto-recovery didn't work.\n\
                         Error: {}\n\n",
                        truncate(&err.to_string(), 200)
                    );
                    if page_ops::detect_captcha(self.driver.as_ref()).await {
                        reason.push_str(
                            "A CAPTCHA is visible on the page; please solve it first.\n",
                        );
                    }
                    reason.push_str(
                        "Please check the browser window, fix the page manually \
                         if needed, then type 'continue' to resume.",
                    );
                    self.events.emit(&StepEvent::HandoffRequested {
                        index,
                        reason: reason.clone(),
                    });
                    self.handoff.wait_for_continue(queues, &reason).await?;

                    match self.run_step(step, &profile, queues).await {
                        Ok(()) => self.emit_completed(index, kind, true, true),
                        Err(final_err) => {
                            self.events.emit(&StepEvent::StepFailed {
                                index,
                                kind: kind.to_string(),
                                error: final_err.to_string(),
                            });
                            return Err(final_err);
                        }
                    }
                }
            }
        }
        info!(steps = total, "plan execution complete");
        Ok(self.results.clone())
    }

    async fn run_reasoning(
        &mut self,
        step: &ActionStep,
        profile: &mut Map<String, Value>,
        queues: &mut SessionQueues,
        index: usize,
    ) -> Result<(), FlowError> {
        // The loop assumes it is looking at the intent's form; a detour left
        // behind by earlier steps is corrected here, not inside the loop.
        if !self.navigator.is_on_correct_page(self.driver.as_ref()).await {
            if let Err(err) = self
                .navigator
                .navigate_to_intent_page(self.driver.as_ref())
                .await
            {
                warn!(%err, "could not reach the intent page before the reasoning loop");
            }
        }

        let step_json = serde_json::to_value(step).unwrap_or(json!({"action": "agentic_loop"}));
        let reasoning = ReasoningLoop {
            driver: self.driver.as_ref(),
            decider: self.decider.as_ref(),
            locator: self.locator.as_ref(),
            events: self.events.as_ref(),
            intent: &self.intent,
            form_hint: self.form_hint.as_deref(),
            config: self.config.loop_config,
        };
        match reasoning.run(&step_json, profile, queues).await {
            Ok(state) => {
                self.results
                    .insert("agentic_loop", json!(state.as_str()));
                self.emit_completed(index, "agentic_loop", false, false);
                Ok(())
            }
            Err(err) => {
                self.events.emit(&StepEvent::StepFailed {
                    index,
                    kind: "agentic_loop".to_string(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_step(
        &mut self,
        step: &ActionStep,
        profile: &Map<String, Value>,
        queues: &mut SessionQueues,
    ) -> Result<(), FlowError> {
        let driver = self.driver.as_ref();
        match step {
            ActionStep::Navigate { url } => {
                driver.navigate(url).await?;
            }
            ActionStep::DismissModal => {
                page_ops::dismiss_modal(driver).await;
            }
            ActionStep::SetLanguage { language } => {
                page_ops::set_language(driver, language).await?;
            }
            ActionStep::SetupProfile => {
                match &self.profile_setup {
                    Some(setup) => {
                        setup.run_wizard().await?;
                        self.results.insert("profile_setup", json!("completed"));
                    }
                    None => warn!("no profile setup wizard configured, skipping"),
                }
            }
            ActionStep::Click {
                selector,
                vision,
                description,
            } => {
                if *vision {
                    let desc = description.as_deref().unwrap_or(selector);
                    fallback::vision_click(driver, self.locator.as_ref(), desc).await?;
                } else {
                    driver.click(selector).await?;
                }
            }
            ActionStep::Fill {
                selector,
                value,
                vision,
                description,
            } => {
                let value = self.results.substitute(value);
                if *vision {
                    let desc = description.as_deref().unwrap_or(selector);
                    fallback::vision_fill(driver, self.locator.as_ref(), desc, &value).await?;
                } else {
                    driver.fill(selector, &value).await?;
                }
            }
            ActionStep::Select {
                selector,
                value,
                label,
            } => {
                let target = SelectTarget {
                    value: value.clone(),
                    label: label.clone(),
                };
                driver.select_option(selector, &target).await?;
            }
            ActionStep::Task {
                handler,
                method,
                params,
            } => {
                let task = self
                    .handlers
                    .get(handler)
                    .ok_or_else(|| FlowError::Handler(format!("unknown task handler: {handler}")))?;
                // Handlers see the profile alongside their own parameters.
                let mut call_params = params.clone();
                call_params.insert("profile".to_string(), Value::Object(profile.clone()));
                let output = task
                    .run(method, &call_params, driver, self.handoff.as_ref(), queues)
                    .await?;
                self.results.merge(output);
            }
            ActionStep::ExtractPageInfo => {
                self.extract_page_info().await?;
            }
            ActionStep::Screenshot { filename } => {
                let path = driver.screenshot(filename).await?;
                self.results
                    .insert("screenshot", json!(path.display().to_string()));
            }
            ActionStep::Wait { seconds } => {
                sleep(Duration::from_secs(*seconds)).await;
            }
            // Dispatched before run_step is reached.
            ActionStep::AgenticLoop { .. } => {}
            ActionStep::Unknown(raw) => {
                warn!(step = %raw, "unknown action kind, skipping");
            }
        }
        Ok(())
    }

    async fn extract_page_info(&mut self) -> Result<(), FlowError> {
        let driver = self.driver.as_ref();
        let info = driver.evaluate(PAGE_INFO_JS).await?;
        if let Some(title) = info.get("title").and_then(Value::as_str) {
            info!(title, "page inspected");
        }
        self.results.insert("page_info", info);

        let headings = driver.evaluate(HEADINGS_JS).await?;
        self.results.insert("headings", headings);

        let body = driver.get_text("main, .content, article, body").await?;
        let preview: String = body.chars().take(500).collect();
        if !preview.is_empty() {
            self.results
                .insert("content_preview", json!(preview.replace('\n', " ")));
        }
        Ok(())
    }

    fn emit_completed(&self, index: usize, kind: &str, after_recovery: bool, after_handoff: bool) {
        self.events.emit(&StepEvent::StepCompleted {
            index,
            kind: kind.to_string(),
            after_recovery,
            after_handoff,
        });
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
