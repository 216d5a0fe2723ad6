use std::collections::BTreeMap;

use formpilot_core_types::IntentId;
use perceiver_dom::DomSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structural action verb a decision can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionVerb {
    Fill,
    Click,
    Select,
}

/// One decision from the service. Exactly one variant is active.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReasoningDecision {
    /// Perform a structural action. An empty `selector` is an explicit signal
    /// to go straight to the visual locator using `label` as the description.
    #[serde(rename = "ACTION")]
    Action {
        action: ActionVerb,
        #[serde(default)]
        selector: String,
        #[serde(default)]
        label: String,
        #[serde(default)]
        value: String,
    },

    /// Missing data, or a CAPTCHA/OTP challenge only a human can answer.
    #[serde(rename = "ASK_USER")]
    AskUser {
        question: String,
        #[serde(default)]
        options: Vec<String>,
    },

    /// Form is complete apart from the final submit.
    #[serde(rename = "READY_TO_SUBMIT")]
    ReadyToSubmit {
        #[serde(default)]
        summary: BTreeMap<String, String>,
    },
}

impl ReasoningDecision {
    /// Coercion target for anything the service produced that failed schema
    /// validation.
    pub fn ask_user_fallback(reason: &str) -> Self {
        Self::AskUser {
            question: format!(
                "I am having trouble understanding the page ({reason}). How should I proceed?"
            ),
            options: Vec::new(),
        }
    }
}

/// Everything the decision service sees for one iteration.
pub struct DecisionContext<'a> {
    pub intent: &'a IntentId,
    pub snapshot: &'a DomSnapshot,
    /// The originating plan step, serialized. Gives the service the goal hint
    /// that started the open-ended loop.
    pub step: &'a Value,
    /// Profile facts, including the `_history` sub-map of previously asked
    /// questions and their answers.
    pub profile: &'a Map<String, Value>,
    /// Intent-specific form schema hint from the site recipe, if any.
    pub form_hint: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_decision_round_trips() {
        let raw = r#"{"type":"ACTION","action":"select","selector":"[data-agent-id=\"fp-3\"]",
                      "label":"Season","value":"Kharif"}"#;
        let decision: ReasoningDecision = serde_json::from_str(raw).unwrap();
        match decision {
            ReasoningDecision::Action { action, value, .. } => {
                assert_eq!(action, ActionVerb::Select);
                assert_eq!(value, "Kharif");
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn ask_user_defaults_options() {
        let raw = r#"{"type":"ASK_USER","question":"Please enter the CAPTCHA shown."}"#;
        let decision: ReasoningDecision = serde_json::from_str(raw).unwrap();
        match decision {
            ReasoningDecision::AskUser { options, .. } => assert!(options.is_empty()),
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn ready_to_submit_carries_summary() {
        let raw = r#"{"type":"READY_TO_SUBMIT","summary":{"Full Name":"Ravi","Season":"Kharif"}}"#;
        let decision: ReasoningDecision = serde_json::from_str(raw).unwrap();
        match decision {
            ReasoningDecision::ReadyToSubmit { summary } => {
                assert_eq!(summary.get("Season").map(String::as_str), Some("Kharif"));
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }
}
