//! Prompt construction for the decision service.

use serde_json::{Map, Value};

use crate::model::DecisionContext;

const FIELD_MAPPING_GUIDE: &str = r#"Profile Field Mapping Guide (profile key -> form field):
- "full_name" or "name" -> Full Name input
- "mobile" -> Mobile Number input
- "age" -> Age input
- "gender" -> Gender dropdown
- "caste" or "category" -> Caste Category dropdown
- "relationship" -> Relationship dropdown
- "relative_name" -> Father/Husband Name input
- "state" -> State dropdown (NOTE: there may be multiple state dropdowns, residential AND bank)
- "district" -> District dropdown (residential section)
- "taluka" or "sub_district" -> Sub-District/Tehsil dropdown
- "village" -> Village/Town dropdown
- "pincode" -> PIN Code input
- "address" -> Full Address input
- "aadhaar" -> Aadhaar Number input
- "bank_name" -> Bank Name dropdown (bank section)
- "bank_branch" -> Branch dropdown (bank section)
- "account_no" -> Bank Account Number input
- "season" -> Season dropdown
- "crop_year" or "year" -> Year dropdown"#;

const RESPONSE_FORMATS: &str = r#"You MUST respond with a JSON object in one of three formats:

1. ACTION - if you have the data needed to fill a field, click a button, or select an option:
{"type":"ACTION","action":"fill","selector":"CSS selector from the DOM state (leave empty \"\" if unknown)","label":"Human-readable label of the element, used by a vision locator if the selector is empty","value":"Value to fill or select"}
The "action" field is one of "fill", "click", "select".

2. ASK_USER - if you are missing data for a REQUIRED field currently visible in the DOM, or if there is a CAPTCHA or OTP challenge:
{"type":"ASK_USER","question":"Clear question asking the user for this specific data","options":["Option 1","Option 2"]}
Include "options" when asking about a dropdown.

3. READY_TO_SUBMIT - if the form is completely filled and only the final submit remains:
{"type":"READY_TO_SUBMIT","summary":{"Field 1":"Value","Field 2":"Value"}}"#;

const RULES: &str = r#"Important Instructions:
- Form fields often unlock in a cascading manner (e.g. State -> District -> Sub-District). Only ask about or fill fields that are currently visible and active in the DOM.
- For dropdowns, prefer checking whether the profile matches one of the available options. Do not guess: use the exact value from the DOM options OR the exact text of one of the options.
- CRITICAL FOR DROPDOWNS: for an ACTION of type "select", the "value" field MUST match either the value OR the text of one of the provided options.
- IF THERE ARE UNFILLED FORM FIELDS visible in the DOM, fill them FIRST. Do NOT ask to solve the CAPTCHA until ALL other applicable fields have been filled.
- The CAPTCHA is always the last step on any page. Only when no other unfilled fields remain, ask the user to solve it.
- If you see an OTP field, ask the user for the OTP (again, only when no other fields logically come first).
- Always output valid JSON. No markdown fences."#;

/// Build the system prompt: intent, originating step, optional form schema
/// hint, profile (with `_history` shown separately so resolved questions are
/// never re-asked), mapping guide, response formats and rules.
pub fn build_system_prompt(ctx: &DecisionContext<'_>) -> String {
    let (display_profile, history) = split_history(ctx.profile);

    let mut prompt = format!(
        "You are an expert form-filling assistant for a web portal.\n\
         Your goal is to complete the user's intent: {intent}.\n\
         You are currently evaluating the following planned step:\n{step}\n",
        intent = ctx.intent,
        step = serde_json::to_string_pretty(ctx.step).unwrap_or_default(),
    );

    if let Some(hint) = ctx.form_hint {
        prompt.push('\n');
        prompt.push_str(hint);
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\nYou have access to the following user profile data:\n{}\n",
        serde_json::to_string_pretty(&display_profile).unwrap_or_default()
    ));

    if !history.is_empty() {
        prompt.push_str(&format!(
            "\nPreviously asked questions and the user's answers (use these to avoid re-asking):\n{}\n",
            serde_json::to_string_pretty(&history).unwrap_or_default()
        ));
    }

    prompt.push('\n');
    prompt.push_str(FIELD_MAPPING_GUIDE);
    prompt.push_str(
        "\n\nYou will receive the current DOM state of the form representing interactable elements.\n\
         Analyze the DOM state, the profile, and the planned step, then decide what to do next.\n\n",
    );
    prompt.push_str(RESPONSE_FORMATS);
    prompt.push_str("\n\n");
    prompt.push_str(RULES);
    prompt
}

/// Build the user message carrying the DOM snapshot.
pub fn build_user_message(ctx: &DecisionContext<'_>) -> String {
    format!(
        "Current DOM State:\n{}\n\nWhat is the next step?",
        ctx.snapshot.to_prompt_json()
    )
}

fn split_history(profile: &Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut display = Map::new();
    let mut history = Map::new();
    for (key, value) in profile {
        if key == "_history" {
            if let Value::Object(map) = value {
                history = map.clone();
            }
        } else {
            display.insert(key.clone(), value.clone());
        }
    }
    (display, history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_core_types::IntentId;
    use perceiver_dom::DomSnapshot;
    use serde_json::json;

    #[test]
    fn history_is_surfaced_separately() {
        let intent = IntentId::from("apply_insurance");
        let snapshot = DomSnapshot::empty();
        let step = json!({"action": "agentic_loop"});
        let mut profile = Map::new();
        profile.insert("full_name".into(), json!("Ravi"));
        profile.insert("_history".into(), json!({"Pick a season": "Kharif"}));

        let ctx = DecisionContext {
            intent: &intent,
            snapshot: &snapshot,
            step: &step,
            profile: &profile,
            form_hint: None,
        };
        let prompt = build_system_prompt(&ctx);
        assert!(prompt.contains("Previously asked questions"));
        assert!(prompt.contains("Kharif"));
        // The raw _history key must not appear in the displayed profile.
        assert!(!prompt.contains("\"_history\""));
    }

    #[test]
    fn form_hint_is_included_when_present() {
        let intent = IntentId::from("calculate_premium");
        let snapshot = DomSnapshot::empty();
        let step = json!({"action": "agentic_loop"});
        let profile = Map::new();
        let ctx = DecisionContext {
            intent: &intent,
            snapshot: &snapshot,
            step: &step,
            profile: &profile,
            form_hint: Some("The premium calculator is a modal on the home page."),
        };
        let prompt = build_system_prompt(&ctx);
        assert!(prompt.contains("premium calculator is a modal"));
    }
}
