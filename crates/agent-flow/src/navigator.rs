use std::sync::Arc;
use std::time::Duration;

use browser_adapter::{page_ops, BrowserDriver};
use formpilot_core_types::IntentId;
use formpilot_recipes::Sitemap;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Page-aware recovery for failed plan steps.
///
/// `recover` answers "can we get back to a page where the step might work",
/// trying the cheapest fix first: no navigation at all, then a single hop,
/// then a guaranteed two-hop path through home.
pub struct Navigator {
    sitemap: Arc<Sitemap>,
    intent: IntentId,
}

impl Navigator {
    pub fn new(sitemap: Arc<Sitemap>, intent: IntentId) -> Self {
        Self { sitemap, intent }
    }

    pub async fn current_page_key(&self, driver: &dyn BrowserDriver) -> String {
        let url = driver.current_url().await.unwrap_or_default();
        let key = self.sitemap.match_current_page(&url);
        debug!(page = %key, url = %url, "identified current page");
        key
    }

    pub async fn is_on_correct_page(&self, driver: &dyn BrowserDriver) -> bool {
        let target = self.sitemap.recipe().route_for(self.intent.as_str());
        self.current_page_key(driver).await == target
    }

    /// Navigate straight to the active intent's target page.
    pub async fn navigate_to_intent_page(
        &self,
        driver: &dyn BrowserDriver,
    ) -> Result<(), browser_adapter::DriverError> {
        let target_url = self.sitemap.find_route(self.intent.as_str());
        info!(intent = %self.intent, url = %target_url, "navigating to intent page");
        driver.navigate(&target_url).await?;
        page_ops::dismiss_modal(driver).await;
        Ok(())
    }

    /// Attempt recovery after a step failure. Returns true when the caller
    /// should retry the step, false when only a human handoff is left.
    pub async fn recover(&self, driver: &dyn BrowserDriver, reason: &str) -> bool {
        let current_url = driver.current_url().await.unwrap_or_default();
        let current_key = self.sitemap.match_current_page(&current_url);
        let target_key = self.sitemap.recipe().route_for(self.intent.as_str()).to_string();
        let target_url = self.sitemap.find_route(self.intent.as_str());

        warn!(
            reason = %truncate(reason, 120),
            current = %current_key,
            target = %target_key,
            intent = %self.intent,
            "auto-recovery triggered"
        );

        // Stale but correct: the page is right, the viewport state may not be.
        if current_key == target_key {
            info!("already on target page, resetting scroll and retrying");
            page_ops::scroll_to_top(driver).await;
            sleep(Duration::from_secs(2)).await;
            return true;
        }

        if current_key == "home" {
            info!("on homepage, dismissing modal and re-navigating");
            page_ops::dismiss_modal(driver).await;
            sleep(Duration::from_secs(1)).await;
            if driver.navigate(&target_url).await.is_ok() {
                page_ops::dismiss_modal(driver).await;
                return true;
            }
        } else {
            info!(url = %target_url, "navigating directly to target");
            match driver.navigate(&target_url).await {
                Ok(()) => {
                    page_ops::dismiss_modal(driver).await;
                    return true;
                }
                Err(err) => warn!(%err, "direct navigation failed"),
            }
        }

        // Two-hop fallback: home first, then the target.
        info!("falling back to home, then target");
        let home_url = self
            .sitemap
            .recipe()
            .page_url("home")
            .unwrap_or_else(|| self.sitemap.recipe().base_url.clone());
        if let Err(err) = driver.navigate(&home_url).await {
            warn!(%err, "recovery failed entirely");
            return false;
        }
        page_ops::dismiss_modal(driver).await;
        sleep(Duration::from_secs(2)).await;
        match driver.navigate(&target_url).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "recovery failed entirely");
                false
            }
        }
    }

}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_adapter::{DriverCall, ScriptedDriver};
    use formpilot_recipes::crop_insurance_recipe;

    fn navigator(intent: &str) -> Navigator {
        let sitemap = Arc::new(Sitemap::new(crop_insurance_recipe()));
        Navigator::new(sitemap, IntentId::from(intent))
    }

    #[tokio::test(start_paused = true)]
    async fn on_target_page_no_navigation_happens() {
        let driver = ScriptedDriver::new();
        driver.set_current_url("https://pmfby.gov.in/farmerRegistrationForm");
        let nav = navigator("apply_insurance");

        assert!(nav.recover(&driver, "selector not found: #x").await);
        assert_eq!(
            nav.current_page_key(&driver).await,
            "farmer_registration"
        );
        assert_eq!(
            driver.call_count(|c| matches!(c, DriverCall::Navigate(_))),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn from_home_renavigates_to_target() {
        let driver = ScriptedDriver::new();
        driver.set_current_url("https://pmfby.gov.in/");
        let nav = navigator("apply_insurance");

        assert!(nav.recover(&driver, "lost").await);
        assert!(driver.calls().iter().any(|c| matches!(
            c,
            DriverCall::Navigate(url) if url.contains("farmerRegistrationForm")
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn direct_navigation_failure_falls_back_through_home() {
        let driver = ScriptedDriver::new();
        driver.set_current_url("https://elsewhere.example/asdf");
        // First hit on the target URL fails, the retry after the home hop works.
        driver.fail_navigation("farmerRegistrationForm", 1);
        let nav = navigator("apply_insurance");

        assert!(nav.recover(&driver, "nav error").await);
        let navigations: Vec<_> = driver
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                DriverCall::Navigate(url) => Some(url),
                _ => None,
            })
            .collect();
        // target (fails), home, target again.
        assert_eq!(navigations.len(), 3);
        assert!(navigations[1].ends_with("pmfby.gov.in/"));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_site_reports_failure() {
        let driver = ScriptedDriver::new();
        driver.set_current_url("https://elsewhere.example/asdf");
        driver.fail_navigation("pmfby.gov.in", usize::MAX);
        let nav = navigator("apply_insurance");

        assert!(!nav.recover(&driver, "nav error").await);
    }
}
