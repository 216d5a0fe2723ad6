use url::Url;

use crate::recipe::SiteRecipe;

/// Page identity and routing over a [`SiteRecipe`].
///
/// Used by navigation recovery to answer "where am I" from the raw browser
/// URL, without ever dereferencing the page itself.
pub struct Sitemap {
    recipe: SiteRecipe,
}

impl Sitemap {
    pub fn new(recipe: SiteRecipe) -> Self {
        Self { recipe }
    }

    pub fn recipe(&self) -> &SiteRecipe {
        &self.recipe
    }

    /// Absolute URL an intent should land on.
    pub fn find_route(&self, intent: &str) -> String {
        let page = self.recipe.route_for(intent);
        self.recipe
            .page_url(page)
            .unwrap_or_else(|| self.recipe.base_url.clone())
    }

    /// Identify the known page a URL is on.
    ///
    /// Matching is a case-insensitive path substring check against the page
    /// table, skipping the bare "/" entry. A same-origin URL that matches
    /// nothing is "home"; anything off-origin is "unknown".
    pub fn match_current_page(&self, url: &str) -> String {
        let url_lower = url.to_lowercase();
        for (key, entry) in &self.recipe.page_urls {
            let path = entry
                .to_lowercase()
                .trim_start_matches(&self.recipe.base_url.to_lowercase())
                .to_string();
            if !path.is_empty() && path != "/" && url_lower.contains(&path) {
                return key.clone();
            }
        }
        if self.same_origin(url) {
            "home".to_string()
        } else {
            "unknown".to_string()
        }
    }

    fn same_origin(&self, url: &str) -> bool {
        match (Url::parse(url), Url::parse(&self.recipe.base_url)) {
            (Ok(a), Ok(b)) => a.origin() == b.origin(),
            _ => false,
        }
    }

    /// Human-readable page listing, used by site-description prompts and the
    /// intents listing.
    pub fn describe_site(&self) -> String {
        let mut lines = vec![format!("{} site pages:", self.recipe.site_name)];
        for (key, _) in &self.recipe.page_urls {
            if let Some(full) = self.recipe.page_url(key) {
                lines.push(format!("  {key:28} {full}"));
            }
        }
        lines.join("\n")
    }
}
