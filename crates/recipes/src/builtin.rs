use std::collections::BTreeMap;

use crate::recipe::{IntentSpec, SiteRecipe};

/// Built-in recipe for the national crop-insurance portal.
///
/// Shipped in code rather than YAML so `formpilot run` works with no config
/// file; a YAML recipe with the same shape can replace it via `--recipe`.
pub fn crop_insurance_recipe() -> SiteRecipe {
    let page_urls: BTreeMap<String, String> = [
        ("home", "/"),
        ("faq", "/faq"),
        ("contact", "/contact"),
        ("sitemap", "/sitemap"),
        ("feedback", "/feedback"),
        ("rti", "/rti"),
        ("help", "/help"),
        ("terms", "/termsCondition"),
        ("privacy", "/privacyPolicy"),
        ("copyright", "/copyrightPolicy"),
        ("krph", "/krph/"),
        ("lms", "/lms/"),
        ("yestech", "/yestech/"),
        ("winds", "/winds/"),
        ("cropic", "/cropic/"),
        ("guidelines", "/guidelines"),
        ("farmer_registration", "/farmerRegistrationForm"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let intent_routes: BTreeMap<String, String> = [
        ("apply_insurance", "farmer_registration"),
        ("calculate_premium", "home"),
        ("check_status", "home"),
        ("raise_grievance", "krph"),
        ("check_complaint", "krph"),
        ("access_lms", "lms"),
        ("view_weather", "winds"),
        ("upload_crop_photo", "cropic"),
        ("track_cropic", "cropic"),
        ("access_yestech", "yestech"),
        ("traverse_site", "home"),
        ("navigate_page", "home"),
        ("get_info", "faq"),
        ("setup_profile", "home"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let intents: BTreeMap<String, IntentSpec> = [
        (
            "traverse_site",
            "Explore pages, build sitemap, list links",
            vec![],
        ),
        (
            "apply_insurance",
            "Fill farmer registration / crop insurance form",
            vec!["state", "district", "crop", "season", "area"],
        ),
        (
            "calculate_premium",
            "Calculate insurance premium for a crop",
            vec!["crop", "season", "state", "district", "area"],
        ),
        (
            "check_status",
            "Check application status using receipt/policy number",
            vec!["receipt_number", "policy_id"],
        ),
        (
            "raise_grievance",
            "File a complaint or report crop loss via KRPH",
            vec!["mobile"],
        ),
        (
            "check_complaint",
            "Check KRPH complaint/crop-loss intimation status",
            vec!["mobile"],
        ),
        (
            "access_lms",
            "Register or log in to the LMS for training courses",
            vec!["mobile"],
        ),
        ("view_weather", "View weather data on the WINDS portal", vec![]),
        (
            "upload_crop_photo",
            "Upload a crop photo via the CROPIC portal",
            vec!["mobile"],
        ),
        (
            "track_cropic",
            "Track crop photo submission status on CROPIC",
            vec!["reference_id"],
        ),
        (
            "access_yestech",
            "Navigate to the YES-TECH yield estimation portal",
            vec![],
        ),
        (
            "navigate_page",
            "Navigate to a specific page (FAQ, contact, sitemap, etc.)",
            vec!["page"],
        ),
        (
            "get_info",
            "Get information about the scheme, documents, or eligibility",
            vec![],
        ),
        (
            "setup_profile",
            "Set up or update the local farmer profile for form pre-filling",
            vec![],
        ),
    ]
    .into_iter()
    .map(|(id, desc, params)| {
        (
            id.to_string(),
            IntentSpec {
                description: desc.to_string(),
                params: params.into_iter().map(str::to_string).collect(),
            },
        )
    })
    .collect();

    let form_hints: BTreeMap<String, String> = [
        (
            "apply_insurance",
            "The registration form's inputs and selects carry no id or name \
             attributes; rely on the injected data-agent-id selectors. State, \
             district, and bank dropdowns cascade, so fill them top to bottom \
             and expect later dropdowns to populate only after earlier picks.",
        ),
        (
            "calculate_premium",
            "The premium calculator opens from a card on the landing page. \
             Season, year, scheme, state, district, and crop must be chosen in \
             order before the Calculate button enables.",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    SiteRecipe {
        site_id: "pmfby".to_string(),
        site_name: "PMFBY".to_string(),
        base_url: "https://pmfby.gov.in".to_string(),
        page_urls,
        intent_routes,
        intents,
        form_hints,
        has_homepage_modal: false,
        uses_postback: false,
        has_language_selector: false,
    }
}
