use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use formpilot_recipes::{crop_insurance_recipe, SiteRecipe};

/// Settings shared by the serve and run commands.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub headless: bool,
    pub screenshots_dir: PathBuf,
    /// External site recipe; the built-in crop insurance portal when absent.
    pub recipe_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            headless: true,
            screenshots_dir: PathBuf::from("screenshots"),
            recipe_path: None,
        }
    }
}

impl AppConfig {
    /// Resolve the active site recipe. A YAML recipe on disk replaces the
    /// built-in one entirely; either way the result is validated before use.
    pub fn load_recipe(&self) -> anyhow::Result<Arc<SiteRecipe>> {
        let recipe = match &self.recipe_path {
            Some(path) => load_recipe_file(path)?,
            None => crop_insurance_recipe(),
        };
        recipe
            .validate()
            .with_context(|| format!("invalid recipe for {}", recipe.site_id))?;
        Ok(Arc::new(recipe))
    }
}

fn load_recipe_file(path: &Path) -> anyhow::Result<SiteRecipe> {
    SiteRecipe::load(path).with_context(|| format!("loading recipe {}", path.display()))
}
