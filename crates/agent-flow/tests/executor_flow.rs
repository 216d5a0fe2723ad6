use std::sync::Arc;

use agent_flow::{
    build_plan, ActionStep, ExecutionPlan, FlowError, HandlerRegistry, Navigator, QueueHandoff,
    RecordingSink, StepExecutor, StepEvent,
};
use agent_flow::session::session_channel;
use browser_adapter::{DriverCall, ScriptedDriver};
use decision_engine::MockDecisionProvider;
use formpilot_core_types::IntentId;
use formpilot_recipes::{crop_insurance_recipe, Sitemap};
use serde_json::{json, Map, Value};
use vision_locator::MockLocator;

fn executor(
    driver: Arc<ScriptedDriver>,
    events: Arc<RecordingSink>,
    intent: &str,
) -> StepExecutor {
    let sitemap = Arc::new(Sitemap::new(crop_insurance_recipe()));
    StepExecutor::new(
        driver,
        Navigator::new(sitemap, IntentId::from(intent)),
        HandlerRegistry::new(),
        Arc::new(QueueHandoff),
        Arc::new(MockDecisionProvider::new()),
        Arc::new(MockLocator::new()),
        events,
        IntentId::from(intent),
    )
}

#[tokio::test(start_paused = true)]
async fn clean_plan_writes_expected_result_keys() {
    let driver = Arc::new(ScriptedDriver::new());
    let events = Arc::new(RecordingSink::new());
    let plan = ExecutionPlan::new(vec![
        ActionStep::Navigate {
            url: "https://pmfby.gov.in/faq".into(),
        },
        ActionStep::Fill {
            selector: "#name".into(),
            value: "Ravi".into(),
            vision: false,
            description: None,
        },
        ActionStep::Click {
            selector: "#submit".into(),
            vision: false,
            description: None,
        },
        ActionStep::Screenshot {
            filename: "done".into(),
        },
    ]);

    let (_handle, mut queues) = session_channel();
    let results = executor(Arc::clone(&driver), Arc::clone(&events), "navigate_page")
        .execute(&plan, Map::new(), &mut queues)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results.get("screenshot"), Some(&json!("screenshots/done.png")));
    assert_eq!(
        events.count(|e| matches!(e, StepEvent::StepCompleted { .. })),
        4
    );
    assert_eq!(events.count(|e| matches!(e, StepEvent::StepFailed { .. })), 0);
}

#[tokio::test(start_paused = true)]
async fn fill_substitutes_earlier_results() {
    let driver = Arc::new(ScriptedDriver::new());
    let events = Arc::new(RecordingSink::new());
    let plan = ExecutionPlan::new(vec![
        ActionStep::Screenshot {
            filename: "proof".into(),
        },
        ActionStep::Fill {
            selector: "#evidence".into(),
            value: "see {screenshot}".into(),
            vision: false,
            description: None,
        },
    ]);

    let (_handle, mut queues) = session_channel();
    executor(Arc::clone(&driver), events, "get_info")
        .execute(&plan, Map::new(), &mut queues)
        .await
        .unwrap();

    assert!(driver.calls().iter().any(|c| matches!(
        c,
        DriverCall::Fill { value, .. } if value == "see screenshots/proof.png"
    )));
}

#[tokio::test(start_paused = true)]
async fn failed_fill_recovers_and_retries_once() {
    let driver = Arc::new(ScriptedDriver::new());
    // Already on the target page, so recovery is the cheap no-navigation tier.
    driver.set_current_url("https://pmfby.gov.in/farmerRegistrationForm");
    driver.fail_selector("#name", 1);
    let events = Arc::new(RecordingSink::new());
    let plan = ExecutionPlan::new(vec![ActionStep::Fill {
        selector: "#name".into(),
        value: "Ravi".into(),
        vision: false,
        description: None,
    }]);

    let (_handle, mut queues) = session_channel();
    let results = executor(Arc::clone(&driver), Arc::clone(&events), "apply_insurance")
        .execute(&plan, Map::new(), &mut queues)
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(
        driver.call_count(|c| matches!(c, DriverCall::Fill { .. })),
        2
    );
    assert_eq!(
        events.count(|e| matches!(e, StepEvent::RecoveryAttempted { recovered: true, .. })),
        1
    );
    assert_eq!(
        events.count(|e| matches!(e, StepEvent::HandoffRequested { .. })),
        0
    );
    assert_eq!(
        events.count(
            |e| matches!(e, StepEvent::StepCompleted { after_recovery: true, after_handoff: false, .. })
        ),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn step_is_attempted_at_most_three_times() {
    let driver = Arc::new(ScriptedDriver::new());
    driver.set_current_url("https://pmfby.gov.in/farmerRegistrationForm");
    driver.fail_selector_always("#name");
    let events = Arc::new(RecordingSink::new());
    let plan = ExecutionPlan::new(vec![
        ActionStep::Fill {
            selector: "#name".into(),
            value: "Ravi".into(),
            vision: false,
            description: None,
        },
        // Never reached: the plan halts on the failed step.
        ActionStep::Click {
            selector: "#submit".into(),
            vision: false,
            description: None,
        },
    ]);

    let (handle, mut queues) = session_channel();
    // Answer the handoff prompt so the final retry can run.
    handle.input_tx.send("continue".to_string()).await.unwrap();

    let err = executor(Arc::clone(&driver), Arc::clone(&events), "apply_insurance")
        .execute(&plan, Map::new(), &mut queues)
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Driver(_)));
    // Initial attempt, one retry after recovery, one retry after handoff.
    assert_eq!(
        driver.call_count(|c| matches!(c, DriverCall::Fill { .. })),
        3
    );
    assert_eq!(
        events.count(|e| matches!(e, StepEvent::RecoveryAttempted { .. })),
        1
    );
    assert_eq!(
        events.count(|e| matches!(e, StepEvent::HandoffRequested { .. })),
        1
    );
    assert_eq!(
        driver.call_count(|c| matches!(c, DriverCall::Click(_))),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn diagnostic_screenshot_is_taken_on_failure() {
    let driver = Arc::new(ScriptedDriver::new());
    driver.set_current_url("https://pmfby.gov.in/faq");
    driver.fail_selector("#missing", 1);
    let events = Arc::new(RecordingSink::new());
    let plan = ExecutionPlan::new(vec![ActionStep::Click {
        selector: "#missing".into(),
        vision: false,
        description: None,
    }]);

    let (_handle, mut queues) = session_channel();
    executor(Arc::clone(&driver), events, "get_info")
        .execute(&plan, Map::new(), &mut queues)
        .await
        .unwrap();

    assert!(driver.calls().iter().any(|c| matches!(
        c,
        DriverCall::Screenshot(name) if name == "error_step_1_click"
    )));
}

#[tokio::test(start_paused = true)]
async fn unknown_step_kind_is_skipped_with_a_trace() {
    let driver = Arc::new(ScriptedDriver::new());
    let events = Arc::new(RecordingSink::new());
    let plan = ExecutionPlan::from_json(
        r#"[
            {"action": "teleport", "destination": "mars"},
            {"action": "screenshot", "filename": "after"}
        ]"#,
    )
    .unwrap();

    let (_handle, mut queues) = session_channel();
    let results = executor(Arc::clone(&driver), Arc::clone(&events), "get_info")
        .execute(&plan, Map::new(), &mut queues)
        .await
        .unwrap();

    assert_eq!(results.get("screenshot"), Some(&json!("screenshots/after.png")));
    assert_eq!(
        events.count(|e| matches!(e, StepEvent::StepCompleted { .. })),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn visible_captcha_is_named_in_the_handoff_prompt() {
    let driver = Arc::new(ScriptedDriver::new());
    driver.set_current_url("https://pmfby.gov.in/farmerRegistrationForm");
    driver.fail_selector_always("#name");
    // First evaluate is the scroll reset during recovery, the second is the
    // captcha check before the handoff.
    driver.push_eval_result(Value::Null);
    driver.push_eval_result(json!(true));
    let events = Arc::new(RecordingSink::new());
    let plan = ExecutionPlan::new(vec![ActionStep::Fill {
        selector: "#name".into(),
        value: "Ravi".into(),
        vision: false,
        description: None,
    }]);

    let (handle, mut queues) = session_channel();
    handle.input_tx.send("continue".to_string()).await.unwrap();

    let err = executor(Arc::clone(&driver), Arc::clone(&events), "apply_insurance")
        .execute(&plan, Map::new(), &mut queues)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::Driver(_)));

    let prompt = events
        .events()
        .into_iter()
        .find_map(|e| match e {
            StepEvent::HandoffRequested { reason, .. } => Some(reason),
            _ => None,
        })
        .expect("a handoff prompt was emitted");
    assert!(prompt.contains("CAPTCHA"));
}

#[tokio::test(start_paused = true)]
async fn reasoning_loop_steers_back_to_the_intent_page_first() {
    let driver = Arc::new(ScriptedDriver::new());
    driver.set_current_url("https://pmfby.gov.in/faq");
    let events = Arc::new(RecordingSink::new());
    let plan = ExecutionPlan::new(vec![ActionStep::AgenticLoop { goal: None }]);

    let (handle, mut queues) = session_channel();
    handle.input_tx.send("confirm".to_string()).await.unwrap();

    let results = executor(Arc::clone(&driver), events, "apply_insurance")
        .execute(&plan, Map::new(), &mut queues)
        .await
        .unwrap();

    assert!(driver.calls().iter().any(|c| matches!(
        c,
        DriverCall::Navigate(url) if url.contains("farmerRegistrationForm")
    )));
    assert_eq!(results.get("agentic_loop"), Some(&json!("submitted")));
}

#[tokio::test(start_paused = true)]
async fn built_plan_executes_end_to_end() {
    let driver = Arc::new(ScriptedDriver::new());
    let events = Arc::new(RecordingSink::new());
    let recipe = crop_insurance_recipe();
    let plan = build_plan(&recipe, "get_info", &Map::new(), &HandlerRegistry::new());

    let (_handle, mut queues) = session_channel();
    let results = executor(Arc::clone(&driver), events, "get_info")
        .execute(&plan, Map::new(), &mut queues)
        .await
        .unwrap();

    // extract_page_info stores page info and headings, screenshot its path.
    assert!(results.contains_key("page_info"));
    assert!(results.contains_key("headings"));
    assert!(results.contains_key("screenshot"));
    assert!(driver.calls().iter().any(|c| matches!(
        c,
        DriverCall::Navigate(url) if url == "https://pmfby.gov.in/"
    )));
}
