//! Lenient decoding of decision-service responses.
//!
//! Models wrap JSON in markdown fences, prepend prose, or occasionally emit
//! something that is not JSON at all. Anything that fails to decode into a
//! valid `ReasoningDecision` becomes an ASK_USER decision so the loop keeps
//! a human in the conversation instead of dying.

use tracing::warn;

use crate::model::ReasoningDecision;

/// Decode a raw service response, coercing failures to ASK_USER.
pub fn decode_decision(raw: &str) -> ReasoningDecision {
    let Some(candidate) = extract_json_object(raw) else {
        warn!(raw = %truncate(raw, 200), "decision response contained no JSON object");
        return ReasoningDecision::ask_user_fallback("no JSON in response");
    };

    match serde_json::from_str::<ReasoningDecision>(&candidate) {
        Ok(decision) => decision,
        Err(err) => {
            warn!(%err, raw = %truncate(&candidate, 200), "decision response failed schema validation");
            ReasoningDecision::ask_user_fallback("unrecognized decision shape")
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Pull the first JSON object out of `raw`: as-is, from a fenced block, or
/// by brace matching inside surrounding prose.
pub fn extract_json_object(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with('{') {
        return Some(trim_symmetric(raw));
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                return Some(trim_symmetric(block));
            }
        }
    }

    raw.split('{').nth(1).and_then(|rest| {
        let mut depth = 1i32;
        for (idx, ch) in rest.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let mut candidate = String::from("{");
                        candidate.push_str(&rest[..=idx]);
                        return Some(trim_symmetric(&candidate));
                    }
                }
                _ => {}
            }
        }
        None
    })
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}
