use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_wait_seconds() -> u64 {
    3
}

fn default_language() -> String {
    "English".to_string()
}

fn default_screenshot_name() -> String {
    "result".to_string()
}

/// One step of an execution plan. The JSON shape is `{"action": <kind>, ...}`.
///
/// A step whose kind the executor does not recognize deserializes into
/// `Unknown` and is logged and skipped at dispatch time rather than rejected
/// at parse time; a plan with a typo in one step still runs its other steps.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionStep {
    Navigate {
        url: String,
    },
    Click {
        selector: String,
        #[serde(default)]
        vision: bool,
        #[serde(default)]
        description: Option<String>,
    },
    Fill {
        selector: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        vision: bool,
        #[serde(default)]
        description: Option<String>,
    },
    Select {
        selector: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        label: Option<String>,
    },
    Task {
        handler: String,
        method: String,
        #[serde(default)]
        params: Map<String, Value>,
    },
    ExtractPageInfo,
    Screenshot {
        #[serde(default = "default_screenshot_name")]
        filename: String,
    },
    Wait {
        #[serde(default = "default_wait_seconds")]
        seconds: u64,
    },
    DismissModal,
    SetLanguage {
        #[serde(default = "default_language")]
        language: String,
    },
    SetupProfile,
    AgenticLoop {
        #[serde(default)]
        goal: Option<String>,
    },
    #[serde(untagged)]
    Unknown(Value),
}

impl ActionStep {
    /// Short kind name for logs, events, and diagnostic screenshot names.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionStep::Navigate { .. } => "navigate",
            ActionStep::Click { .. } => "click",
            ActionStep::Fill { .. } => "fill",
            ActionStep::Select { .. } => "select",
            ActionStep::Task { .. } => "task",
            ActionStep::ExtractPageInfo => "extract_page_info",
            ActionStep::Screenshot { .. } => "screenshot",
            ActionStep::Wait { .. } => "wait",
            ActionStep::DismissModal => "dismiss_modal",
            ActionStep::SetLanguage { .. } => "set_language",
            ActionStep::SetupProfile => "setup_profile",
            ActionStep::AgenticLoop { .. } => "agentic_loop",
            ActionStep::Unknown(_) => "unknown",
        }
    }
}

/// Ordered step list. Execution is strictly sequential.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionPlan {
    pub steps: Vec<ActionStep>,
}

impl ExecutionPlan {
    pub fn new(steps: Vec<ActionStep>) -> Self {
        Self { steps }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_tagged_steps() {
        let plan = ExecutionPlan::from_json(
            r##"[
                {"action": "navigate", "url": "https://pmfby.gov.in/"},
                {"action": "fill", "selector": "#name", "value": "Ravi"},
                {"action": "wait"},
                {"action": "agentic_loop"}
            ]"##,
        )
        .unwrap();
        assert_eq!(plan.len(), 4);
        assert!(matches!(&plan.steps[0], ActionStep::Navigate { url } if url.ends_with(".in/")));
        assert!(matches!(&plan.steps[2], ActionStep::Wait { seconds: 3 }));
        assert!(matches!(&plan.steps[3], ActionStep::AgenticLoop { goal: None }));
    }

    #[test]
    fn unknown_kind_is_kept_not_rejected() {
        let plan = ExecutionPlan::from_json(
            r#"[{"action": "teleport", "destination": "mars"}, {"action": "dismiss_modal"}]"#,
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[0].kind(), "unknown");
        assert_eq!(plan.steps[1].kind(), "dismiss_modal");
    }

    #[test]
    fn step_round_trips_through_json() {
        let step = ActionStep::Click {
            selector: "#submit".into(),
            vision: true,
            description: Some("the submit button".into()),
        };
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["action"], json!("click"));
        let back: ActionStep = serde_json::from_value(value).unwrap();
        assert_eq!(back.kind(), "click");
    }
}
