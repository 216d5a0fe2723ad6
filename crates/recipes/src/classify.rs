use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Outcome of local intent classification.
#[derive(Clone, Debug, Serialize)]
pub struct ClassifiedIntent {
    pub intent: String,
    pub params: BTreeMap<String, String>,
    pub confidence: f32,
}

/// Keyword table: intent id, trigger phrases, base confidence.
///
/// Phrases earlier in the list are more specific; an intent scores by the
/// number of phrases the prompt contains.
const KEYWORD_TABLE: &[(&str, &[&str], f32)] = &[
    ("setup_profile", &["setup profile", "set up my profile", "update my profile", "farmer profile"], 0.9),
    ("track_cropic", &["track", "submission status", "photo status"], 0.75),
    ("upload_crop_photo", &["upload", "crop photo", "photo of my crop"], 0.85),
    ("check_complaint", &["complaint status", "intimation status", "grievance status", "status"], 0.85),
    ("raise_grievance", &["grievance", "complaint", "crop loss", "report loss", "krph"], 0.8),
    ("check_status", &["application status", "policy status", "receipt", "status of my"], 0.8),
    ("calculate_premium", &["premium", "calculate", "how much will insurance cost"], 0.85),
    ("apply_insurance", &["apply", "registration form", "register for insurance", "fill the form", "insure my crop"], 0.8),
    ("access_lms", &["lms", "training", "course"], 0.8),
    ("view_weather", &["weather", "winds", "rainfall"], 0.8),
    ("access_yestech", &["yestech", "yes-tech", "yield estimation"], 0.85),
    ("traverse_site", &["explore", "sitemap", "list pages", "all the pages"], 0.75),
    ("navigate_page", &["open the", "go to the", "show me the"], 0.6),
    ("get_info", &["what is", "tell me about", "eligibility", "documents required"], 0.6),
];

static RECEIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:receipt|reference|policy)\s*(?:number|no\.?|id)?\s*[:#]?\s*([A-Z0-9][A-Z0-9-]{3,})").unwrap());
static SEASON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(kharif|rabi|zaid)\b").unwrap());
static AREA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:hectares?|ha|acres?)\b").unwrap());
static MOBILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([6-9]\d{9})\b").unwrap());

/// Classify a free-text prompt into an intent by keyword scoring.
///
/// Returns None when nothing in the prompt triggers any intent; callers then
/// fall back to asking the user or to a remote classifier.
pub fn classify_intent(prompt: &str) -> Option<ClassifiedIntent> {
    let lowered = prompt.to_lowercase();
    let mut best: Option<(&str, usize, f32)> = None;
    for (intent, phrases, confidence) in KEYWORD_TABLE {
        let hits = phrases.iter().filter(|p| lowered.contains(**p)).count();
        if hits == 0 {
            continue;
        }
        match best {
            Some((_, best_hits, _)) if hits <= best_hits => {}
            _ => best = Some((intent, hits, *confidence)),
        }
    }
    let (intent, hits, confidence) = best?;
    let params = extract_params(prompt);
    debug!(intent, hits, "classified prompt locally");
    Some(ClassifiedIntent {
        intent: intent.to_string(),
        params,
        confidence,
    })
}

fn extract_params(prompt: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    if let Some(caps) = RECEIPT_RE.captures(prompt) {
        params.insert("receipt_number".to_string(), caps[1].to_string());
    }
    if let Some(caps) = SEASON_RE.captures(prompt) {
        let mut season = caps[1].to_lowercase();
        if let Some(first) = season.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        params.insert("season".to_string(), season);
    }
    if let Some(caps) = AREA_RE.captures(prompt) {
        params.insert("area".to_string(), caps[1].to_string());
    }
    if let Some(caps) = MOBILE_RE.captures(prompt) {
        params.insert("mobile".to_string(), caps[1].to_string());
    }
    params
}
