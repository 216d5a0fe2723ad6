use std::time::Duration;

use browser_adapter::{BrowserDriver, SelectTarget};
use decision_engine::{ActionVerb, DecisionContext, DecisionProvider, ReasoningDecision};
use formpilot_core_types::IntentId;
use perceiver_dom::{DomPerceiver, DomSnapshot};
use serde_json::{json, Map, Value};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};
use vision_locator::VisualLocator;

use crate::errors::FlowError;
use crate::events::{EventSink, StepEvent};
use crate::fallback;
use crate::session::{AgentReply, SessionQueues, USER_INPUT_TIMEOUT};

/// Loop bounds. Every suspension point inside the loop is bounded by one of
/// these; the only unbounded wait in the system is the CLI stdin handoff.
#[derive(Clone, Copy, Debug)]
pub struct LoopConfig {
    pub max_iterations: usize,
    pub dom_fetch_timeout: Duration,
    pub input_timeout: Duration,
    pub settle: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            dom_fetch_timeout: Duration::from_secs(15),
            input_timeout: USER_INPUT_TIMEOUT,
            settle: Duration::from_secs(2),
        }
    }
}

/// Where the loop ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Submitted,
    Exhausted,
}

impl LoopState {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopState::Submitted => "submitted",
            LoopState::Exhausted => "exhausted",
        }
    }
}

/// Open-ended form-driving loop: observe the DOM, ask the decision service
/// for one next move, act on it (or yield to the user), repeat.
///
/// Correctness hinges on re-grounding: the DOM is re-fetched immediately
/// before acting because cascading dropdowns and async loads routinely
/// mutate the page between observation and action.
pub struct ReasoningLoop<'a> {
    pub driver: &'a dyn BrowserDriver,
    pub decider: &'a dyn DecisionProvider,
    pub locator: &'a dyn VisualLocator,
    pub events: &'a dyn EventSink,
    pub intent: &'a IntentId,
    pub form_hint: Option<&'a str>,
    pub config: LoopConfig,
}

impl<'a> ReasoningLoop<'a> {
    /// Drive the loop to a terminal state.
    ///
    /// `Ok(Submitted)` means the user confirmed final submission. Exhausting
    /// the iteration cap pushes a terminal error reply and returns
    /// `IterationLimitExceeded`; an unanswered question within the input
    /// timeout returns `UserInputTimeout`.
    pub async fn run(
        &self,
        step: &Value,
        profile: &mut Map<String, Value>,
        queues: &mut SessionQueues,
    ) -> Result<LoopState, FlowError> {
        let perceiver = DomPerceiver::new();
        let cap = self.config.max_iterations;

        for iteration in 1..=cap {
            self.events.emit(&StepEvent::LoopIteration { iteration, cap });

            let snapshot = match timeout(
                self.config.dom_fetch_timeout,
                perceiver.snapshot(self.driver),
            )
            .await
            {
                Ok(snapshot) => snapshot,
                Err(_) => {
                    warn!(
                        timeout_s = self.config.dom_fetch_timeout.as_secs(),
                        "DOM fetch timed out, skipping iteration"
                    );
                    sleep(self.config.settle).await;
                    continue;
                }
            };

            let decision = self.decide(&snapshot, step, profile).await;

            match decision {
                ReasoningDecision::AskUser { question, options } => {
                    self.events.emit(&StepEvent::LoopYielded {
                        question: question.clone(),
                    });
                    queues
                        .push(AgentReply::RequiresInput {
                            question: question.clone(),
                            options,
                        })
                        .await;
                    let answer = queues.await_input(self.config.input_timeout).await?;
                    info!(%question, "user answered");
                    record_history(profile, &question, &answer);
                }

                ReasoningDecision::ReadyToSubmit { summary } => {
                    queues.push(AgentReply::ReadyToSubmit { summary }).await;
                    info!("awaiting final submission confirmation");
                    queues.await_input(self.config.input_timeout).await?;
                    info!("user confirmed submission");
                    self.events.emit(&StepEvent::LoopFinished {
                        state: LoopState::Submitted.as_str().to_string(),
                    });
                    return Ok(LoopState::Submitted);
                }

                ReasoningDecision::Action {
                    action,
                    selector,
                    label,
                    value,
                } => {
                    // Re-ground before acting: the probe run re-injects the
                    // stable ids, so a selector from the decision stays
                    // addressable even if the page mutated since observation.
                    if timeout(
                        self.config.dom_fetch_timeout,
                        perceiver.snapshot(self.driver),
                    )
                    .await
                    .is_err()
                    {
                        warn!("DOM re-fetch timed out, acting on stale state");
                    }

                    if let Err(err) = self
                        .perform_action(action, &selector, &label, &value)
                        .await
                    {
                        // A failed single action is not fatal; the next
                        // iteration re-observes and decides again.
                        warn!(%err, verb = ?action, selector = %selector, "action failed");
                    }
                    sleep(self.config.settle).await;
                }
            }
        }

        self.events.emit(&StepEvent::LoopFinished {
            state: LoopState::Exhausted.as_str().to_string(),
        });
        queues
            .push(AgentReply::Error {
                error: format!("agent exceeded maximum iterations ({cap})"),
            })
            .await;
        Err(FlowError::IterationLimitExceeded(cap))
    }

    async fn decide(
        &self,
        snapshot: &DomSnapshot,
        step: &Value,
        profile: &Map<String, Value>,
    ) -> ReasoningDecision {
        let ctx = DecisionContext {
            intent: self.intent,
            snapshot,
            step,
            profile,
            form_hint: self.form_hint,
        };
        match self.decider.decide(&ctx).await {
            Ok(decision) => decision,
            // A transport failure is treated like a malformed response: the
            // user gets the wheel instead of the loop crashing.
            Err(err) => {
                warn!(%err, "decision service unavailable");
                ReasoningDecision::ask_user_fallback(&err.to_string())
            }
        }
    }

    async fn perform_action(
        &self,
        verb: ActionVerb,
        selector: &str,
        label: &str,
        value: &str,
    ) -> Result<(), FlowError> {
        // An empty selector is the service explicitly asking for the visual
        // path; the label is the only description we have.
        if selector.is_empty() {
            let target = if label.is_empty() { "the target field" } else { label };
            return match verb {
                ActionVerb::Fill => {
                    fallback::vision_fill(
                        self.driver,
                        self.locator,
                        &format!("the input field for {target}"),
                        value,
                    )
                    .await
                }
                ActionVerb::Click => {
                    fallback::vision_click(
                        self.driver,
                        self.locator,
                        &format!("the {target} button"),
                    )
                    .await
                }
                ActionVerb::Select => {
                    fallback::vision_select(
                        self.driver,
                        self.locator,
                        &format!("the dropdown for {target}"),
                        value,
                    )
                    .await
                }
            };
        }

        match verb {
            ActionVerb::Fill => match self.driver.fill(selector, value).await {
                Ok(()) => Ok(()),
                Err(err) => {
                    warn!(%err, "structural fill failed, trying vision");
                    fallback::vision_fill(
                        self.driver,
                        self.locator,
                        &format!("the input field at {selector}"),
                        value,
                    )
                    .await
                }
            },
            ActionVerb::Click => match self.driver.click(selector).await {
                Ok(()) => Ok(()),
                Err(err) => {
                    warn!(%err, "structural click failed, trying vision");
                    fallback::vision_click(
                        self.driver,
                        self.locator,
                        &format!("the button at {selector}"),
                    )
                    .await
                }
            },
            ActionVerb::Select => {
                let target = SelectTarget::fuzzy(value);
                match self.driver.select_option(selector, &target).await {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        warn!(%err, "structural select failed, trying vision");
                        fallback::vision_select(
                            self.driver,
                            self.locator,
                            &format!("the dropdown at {selector}"),
                            value,
                        )
                        .await
                    }
                }
            }
        }
    }
}

/// Answers are recorded under `_history` keyed by the question text, so the
/// decision service sees resolved questions and does not re-ask them.
fn record_history(profile: &mut Map<String, Value>, question: &str, answer: &str) {
    let history = profile
        .entry("_history".to_string())
        .or_insert_with(|| json!({}));
    if let Some(map) = history.as_object_mut() {
        map.insert(question.to_string(), json!(answer));
    }
}
