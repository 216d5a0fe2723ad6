use formpilot_recipes::SiteRecipe;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::handlers::HandlerRegistry;
use crate::plan::{ActionStep, ExecutionPlan};

/// Intents whose target page hosts an interactive form. Without a registered
/// task handler these run the open-ended reasoning loop on that page.
const FORM_INTENTS: &[&str] = &[
    "apply_insurance",
    "calculate_premium",
    "check_status",
    "raise_grievance",
    "check_complaint",
    "access_lms",
    "upload_crop_photo",
    "track_cropic",
];

/// Preferred task handler and method per intent, used when the handler is
/// actually registered.
const HANDLER_TABLE: &[(&str, &str, &str)] = &[
    ("apply_insurance", "farmer_registration", "fill_form"),
    ("check_status", "application_status", "check_status"),
    ("raise_grievance", "grievance", "file_grievance"),
    ("check_complaint", "grievance", "check_complaint_status"),
    ("access_lms", "lms_access", "login"),
    ("view_weather", "winds_access", "view_public_data"),
    ("upload_crop_photo", "cropic_access", "login"),
    ("track_cropic", "cropic_access", "login"),
    ("access_yestech", "yestech_access", "navigate"),
    ("traverse_site", "site_explorer", "explore"),
];

/// Opener for the premium calculator card on the landing page. The card has
/// an unstable generated class name, so it is clicked visually.
const PREMIUM_CALC_CARD_SELECTOR: &str =
    "#ciList > li.farmerCardList.card-1";

/// Map an intent to an ordered step list.
pub fn build_plan(
    recipe: &SiteRecipe,
    intent: &str,
    params: &Map<String, Value>,
    handlers: &HandlerRegistry,
) -> ExecutionPlan {
    info!(intent, "building plan");
    let plan = match intent {
        "traverse_site" => plan_traverse_site(recipe, params, handlers),
        "navigate_page" => plan_navigate_page(recipe, params),
        "get_info" => plan_get_info(recipe),
        "setup_profile" => ExecutionPlan::new(vec![ActionStep::SetupProfile]),
        _ => plan_for_routed_intent(recipe, intent, params, handlers),
    };
    for (i, step) in plan.steps.iter().enumerate() {
        debug!(step = i + 1, kind = step.kind(), "planned");
    }
    plan
}

fn home_url(recipe: &SiteRecipe) -> String {
    recipe
        .page_url("home")
        .unwrap_or_else(|| recipe.base_url.clone())
}

fn preamble(recipe: &SiteRecipe, url: String) -> Vec<ActionStep> {
    let mut steps = vec![ActionStep::Navigate { url }];
    if recipe.has_homepage_modal {
        steps.push(ActionStep::DismissModal);
    }
    if recipe.has_language_selector {
        steps.push(ActionStep::SetLanguage {
            language: "English".to_string(),
        });
    }
    steps
}

fn plan_traverse_site(
    recipe: &SiteRecipe,
    params: &Map<String, Value>,
    handlers: &HandlerRegistry,
) -> ExecutionPlan {
    let mut steps = preamble(recipe, home_url(recipe));
    if handlers.get("site_explorer").is_some() {
        let mut task_params = params.clone();
        task_params.insert("start_url".to_string(), Value::String(home_url(recipe)));
        steps.push(ActionStep::Task {
            handler: "site_explorer".to_string(),
            method: "explore".to_string(),
            params: task_params,
        });
    } else {
        steps.push(ActionStep::ExtractPageInfo);
    }
    ExecutionPlan::new(steps)
}

fn plan_navigate_page(recipe: &SiteRecipe, params: &Map<String, Value>) -> ExecutionPlan {
    let page = params
        .get("page")
        .or_else(|| params.get("page_name"))
        .and_then(Value::as_str)
        .unwrap_or("home")
        .to_lowercase();
    let url = recipe
        .page_url(&page)
        .unwrap_or_else(|| home_url(recipe));
    ExecutionPlan::new(vec![
        ActionStep::Navigate { url },
        ActionStep::Screenshot {
            filename: format!("page_{page}"),
        },
        ActionStep::ExtractPageInfo,
    ])
}

fn plan_get_info(recipe: &SiteRecipe) -> ExecutionPlan {
    let mut steps = preamble(recipe, home_url(recipe));
    steps.push(ActionStep::ExtractPageInfo);
    steps.push(ActionStep::Screenshot {
        filename: format!("{}_home", recipe.site_id),
    });
    ExecutionPlan::new(steps)
}

fn plan_for_routed_intent(
    recipe: &SiteRecipe,
    intent: &str,
    params: &Map<String, Value>,
    handlers: &HandlerRegistry,
) -> ExecutionPlan {
    let page_key = recipe.route_for(intent).to_string();
    let target_url = recipe
        .page_url(&page_key)
        .unwrap_or_else(|| home_url(recipe));

    let mut steps = preamble(recipe, target_url);
    steps.push(ActionStep::Screenshot {
        filename: format!("{page_key}_form"),
    });

    let registered = HANDLER_TABLE
        .iter()
        .find(|(i, handler, _)| *i == intent && handlers.get(handler).is_some());
    if let Some((_, handler, method)) = registered {
        steps.push(ActionStep::Task {
            handler: handler.to_string(),
            method: method.to_string(),
            params: params.clone(),
        });
        return ExecutionPlan::new(steps);
    }

    if intent == "calculate_premium" {
        steps.push(ActionStep::Click {
            selector: PREMIUM_CALC_CARD_SELECTOR.to_string(),
            vision: true,
            description: Some("the Insurance Premium Calculator card".to_string()),
        });
        steps.push(ActionStep::Wait { seconds: 2 });
    }

    if FORM_INTENTS.contains(&intent) {
        steps.push(ActionStep::AgenticLoop { goal: None });
    } else {
        steps.push(ActionStep::ExtractPageInfo);
    }
    ExecutionPlan::new(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_recipes::crop_insurance_recipe;

    fn kinds(plan: &ExecutionPlan) -> Vec<&'static str> {
        plan.steps.iter().map(|s| s.kind()).collect()
    }

    #[test]
    fn apply_insurance_without_handler_uses_reasoning_loop() {
        let recipe = crop_insurance_recipe();
        let plan = build_plan(&recipe, "apply_insurance", &Map::new(), &HandlerRegistry::new());
        assert_eq!(kinds(&plan), vec!["navigate", "screenshot", "agentic_loop"]);
        assert!(matches!(
            &plan.steps[0],
            ActionStep::Navigate { url } if url.ends_with("/farmerRegistrationForm")
        ));
    }

    #[test]
    fn check_status_with_registered_handler_plans_a_task() {
        let recipe = crop_insurance_recipe();
        let plan = build_plan(
            &recipe,
            "check_status",
            &Map::new(),
            &crate::tasks::builtin_handlers(),
        );
        assert_eq!(kinds(&plan), vec!["navigate", "screenshot", "task"]);
        assert!(matches!(
            &plan.steps[2],
            ActionStep::Task { handler, method, .. }
                if handler == "application_status" && method == "check_status"
        ));
    }

    #[test]
    fn calculate_premium_opens_the_calculator_card_first() {
        let recipe = crop_insurance_recipe();
        let plan = build_plan(&recipe, "calculate_premium", &Map::new(), &HandlerRegistry::new());
        assert_eq!(
            kinds(&plan),
            vec!["navigate", "screenshot", "click", "wait", "agentic_loop"]
        );
        assert!(matches!(&plan.steps[2], ActionStep::Click { vision: true, .. }));
    }

    #[test]
    fn navigate_page_uses_requested_page() {
        let recipe = crop_insurance_recipe();
        let mut params = Map::new();
        params.insert("page".to_string(), Value::String("faq".to_string()));
        let plan = build_plan(&recipe, "navigate_page", &params, &HandlerRegistry::new());
        assert!(matches!(
            &plan.steps[0],
            ActionStep::Navigate { url } if url.ends_with("/faq")
        ));
        assert_eq!(kinds(&plan), vec!["navigate", "screenshot", "extract_page_info"]);
    }

    #[test]
    fn view_weather_without_handler_just_inspects_the_portal() {
        let recipe = crop_insurance_recipe();
        let plan = build_plan(&recipe, "view_weather", &Map::new(), &HandlerRegistry::new());
        assert_eq!(kinds(&plan), vec!["navigate", "screenshot", "extract_page_info"]);
        assert!(matches!(
            &plan.steps[0],
            ActionStep::Navigate { url } if url.ends_with("/winds/")
        ));
    }

    #[test]
    fn setup_profile_is_a_single_step() {
        let recipe = crop_insurance_recipe();
        let plan = build_plan(&recipe, "setup_profile", &Map::new(), &HandlerRegistry::new());
        assert_eq!(kinds(&plan), vec!["setup_profile"]);
    }
}
