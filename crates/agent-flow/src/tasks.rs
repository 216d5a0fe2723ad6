//! Built-in task handlers for portal flows whose shape is fixed enough to
//! script directly instead of running the open-ended reasoning loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use browser_adapter::{page_ops, BrowserDriver};
use serde_json::{json, Map, Value};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::errors::FlowError;
use crate::handlers::{HandlerRegistry, TaskHandler};
use crate::handoff::Handoff;
use crate::session::SessionQueues;

/// Handlers shipped with the binary, keyed by the names the plan builder
/// routes to.
pub fn builtin_handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("application_status", Arc::new(ApplicationStatusHandler));
    registry
}

/// Status lookup lives in a modal on the homepage, opened by the third
/// service card; the selectors below are stable, only the CAPTCHA needs a
/// human.
const STATUS_CARD_SELECTOR: &str = "#ciList > li.farmerCardList.card-3";
const STATUS_INPUT_SELECTOR: &str = ".modal-body input, [class*='InnerCalculator'] input";
const STATUS_RESULT_SELECTOR: &str =
    ".modal-body table, [class*='InnerCalculator'] table, .modal-body";

const CHECK_STATUS_CLICK_JS: &str = r#"
(function () {
  const btn = Array.from(document.querySelectorAll("button"))
    .find(b => b.innerText.trim().toLowerCase().includes("check status"));
  if (!btn) return false;
  btn.click();
  return true;
})()
"#;

/// Application status lookup through the homepage modal.
pub struct ApplicationStatusHandler;

#[async_trait]
impl TaskHandler for ApplicationStatusHandler {
    async fn run(
        &self,
        method: &str,
        params: &Map<String, Value>,
        driver: &dyn BrowserDriver,
        handoff: &dyn Handoff,
        queues: &mut SessionQueues,
    ) -> Result<Map<String, Value>, FlowError> {
        match method {
            "check_status" => check_status(params, driver, handoff, queues).await,
            other => Err(FlowError::Handler(format!(
                "application_status has no method '{other}'"
            ))),
        }
    }
}

async fn check_status(
    params: &Map<String, Value>,
    driver: &dyn BrowserDriver,
    handoff: &dyn Handoff,
    queues: &mut SessionQueues,
) -> Result<Map<String, Value>, FlowError> {
    let receipt = match params
        .get("receipt_number")
        .or_else(|| params.get("policy_id"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        Some(r) => r.to_string(),
        None => {
            handoff
                .wait_for_continue(queues, "Enter your Policy ID / receipt number to look up.")
                .await?
        }
    };
    info!(policy_id = %receipt, "application status lookup");

    if driver.click(STATUS_CARD_SELECTOR).await.is_err() {
        handoff
            .wait_for_continue(
                queues,
                "Please open the 'Application Status' card on the homepage, \
                 then type 'continue'.",
            )
            .await?;
    }
    sleep(Duration::from_secs(3)).await;

    if driver.fill(STATUS_INPUT_SELECTOR, &receipt).await.is_err() {
        handoff
            .wait_for_continue(
                queues,
                &format!(
                    "Please enter '{receipt}' in the Policy ID field, then type 'continue'."
                ),
            )
            .await?;
    }

    if page_ops::detect_captcha(driver).await {
        if let Err(err) = driver.screenshot("status_captcha").await {
            warn!(%err, "captcha screenshot failed");
        }
        handoff
            .wait_for_continue(
                queues,
                "Please solve the CAPTCHA shown in the status modal, enter it \
                 in the CAPTCHA field, then type 'continue'.",
            )
            .await?;
    }

    let clicked = driver
        .evaluate(CHECK_STATUS_CLICK_JS)
        .await
        .unwrap_or(Value::Bool(false));
    if clicked != Value::Bool(true) {
        handoff
            .wait_for_continue(queues, "Please click 'Check Status', then type 'continue'.")
            .await?;
    }
    sleep(Duration::from_secs(3)).await;

    let result_text = driver
        .get_text(STATUS_RESULT_SELECTOR)
        .await
        .unwrap_or_default();
    let shot = driver.screenshot("application_status_result").await.ok();

    let mut out = Map::new();
    out.insert("task".to_string(), json!("check_status"));
    out.insert("policy_id".to_string(), json!(receipt));
    out.insert("status".to_string(), json!("completed"));
    if let Some(path) = shot {
        out.insert(
            "status_screenshot".to_string(),
            json!(path.display().to_string()),
        );
    }
    let preview: String = result_text.trim().chars().take(500).collect();
    if !preview.is_empty() {
        out.insert("result_preview".to_string(), json!(preview));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::session_channel;
    use browser_adapter::{DriverCall, ScriptedDriver};
    use std::sync::Mutex;

    /// Handoff double: records prompts, answers from a queue.
    struct CannedHandoff {
        answers: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedHandoff {
        fn new(answers: Vec<&str>) -> Self {
            let mut answers: Vec<String> = answers.into_iter().map(String::from).collect();
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Handoff for CannedHandoff {
        async fn wait_for_continue(
            &self,
            _queues: &mut SessionQueues,
            reason: &str,
        ) -> Result<String, FlowError> {
            self.prompts.lock().unwrap().push(reason.to_string());
            Ok(self
                .answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| "continue".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_fills_the_policy_id_from_params() {
        let driver = ScriptedDriver::new();
        let handoff = CannedHandoff::new(vec![]);
        let (_handle, mut queues) = session_channel();
        let mut params = Map::new();
        params.insert("receipt_number".to_string(), json!("PB-2026-001"));

        let out = ApplicationStatusHandler
            .run("check_status", &params, &driver, &handoff, &mut queues)
            .await
            .unwrap();

        assert!(driver.calls().iter().any(|c| matches!(
            c,
            DriverCall::Fill { value, .. } if value == "PB-2026-001"
        )));
        assert_eq!(out.get("policy_id"), Some(&json!("PB-2026-001")));
        assert_eq!(out.get("status"), Some(&json!("completed")));
        assert!(out.contains_key("status_screenshot"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_policy_id_is_asked_for_first() {
        let driver = ScriptedDriver::new();
        let handoff = CannedHandoff::new(vec!["RX-42"]);
        let (_handle, mut queues) = session_channel();

        ApplicationStatusHandler
            .run("check_status", &Map::new(), &driver, &handoff, &mut queues)
            .await
            .unwrap();

        assert!(handoff.prompts()[0].contains("Policy ID"));
        assert!(driver.calls().iter().any(|c| matches!(
            c,
            DriverCall::Fill { value, .. } if value == "RX-42"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn visible_captcha_pauses_for_the_user() {
        let driver = ScriptedDriver::new();
        // First visibility probe answers true.
        driver.push_eval_result(json!(true));
        let handoff = CannedHandoff::new(vec![]);
        let (_handle, mut queues) = session_channel();
        let mut params = Map::new();
        params.insert("policy_id".to_string(), json!("PB-1"));

        ApplicationStatusHandler
            .run("check_status", &params, &driver, &handoff, &mut queues)
            .await
            .unwrap();

        assert!(handoff.prompts().iter().any(|p| p.contains("CAPTCHA")));
        assert!(driver.calls().iter().any(|c| matches!(
            c,
            DriverCall::Screenshot(name) if name == "status_captcha"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_method_is_an_error() {
        let driver = ScriptedDriver::new();
        let handoff = CannedHandoff::new(vec![]);
        let (_handle, mut queues) = session_channel();

        let err = ApplicationStatusHandler
            .run("transmogrify", &Map::new(), &driver, &handoff, &mut queues)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Handler(_)));
    }
}
