use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::RecipeError;

/// One intent the portal supports: what it means and which parameters the
/// conversation may supply up front.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IntentSpec {
    pub description: String,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Full description of a target portal.
///
/// Page keys are short stable names ("home", "farmer_registration"); values
/// are paths relative to `base_url` or absolute URLs. Intent routes map
/// intent ids onto page keys.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteRecipe {
    pub site_id: String,
    pub site_name: String,
    pub base_url: String,
    pub page_urls: BTreeMap<String, String>,
    pub intent_routes: BTreeMap<String, String>,
    #[serde(default)]
    pub intents: BTreeMap<String, IntentSpec>,
    /// Extra instructions injected into the reasoning prompt per intent.
    #[serde(default)]
    pub form_hints: BTreeMap<String, String>,
    #[serde(default)]
    pub has_homepage_modal: bool,
    #[serde(default)]
    pub uses_postback: bool,
    #[serde(default)]
    pub has_language_selector: bool,
}

impl SiteRecipe {
    pub fn load(path: &Path) -> Result<Self, RecipeError> {
        let raw = std::fs::read_to_string(path)?;
        let recipe: SiteRecipe = serde_yaml::from_str(&raw)?;
        recipe.validate()?;
        Ok(recipe)
    }

    pub fn validate(&self) -> Result<(), RecipeError> {
        if self.base_url.is_empty() {
            return Err(RecipeError::Invalid("base_url is empty".into()));
        }
        if !self.page_urls.contains_key("home") {
            return Err(RecipeError::Invalid("page table has no 'home' entry".into()));
        }
        for (intent, page) in &self.intent_routes {
            if !self.page_urls.contains_key(page) {
                return Err(RecipeError::Invalid(format!(
                    "intent '{intent}' routes to unknown page '{page}'"
                )));
            }
        }
        Ok(())
    }

    /// Absolute URL for a page key, or None if the key is unknown.
    pub fn page_url(&self, key: &str) -> Option<String> {
        let entry = self.page_urls.get(key)?;
        if entry.starts_with("http") {
            Some(entry.clone())
        } else {
            Some(format!(
                "{}{}",
                self.base_url.trim_end_matches('/'),
                entry
            ))
        }
    }

    /// Page key an intent should land on, falling back to home.
    pub fn route_for(&self, intent: &str) -> &str {
        self.intent_routes
            .get(intent)
            .map(String::as_str)
            .unwrap_or("home")
    }

    pub fn form_hint(&self, intent: &str) -> Option<&str> {
        self.form_hints.get(intent).map(String::as_str)
    }

    pub fn known_intents(&self) -> impl Iterator<Item = (&String, &IntentSpec)> {
        self.intents.iter()
    }
}
