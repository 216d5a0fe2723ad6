//! headless_chrome-backed driver.
//!
//! All headless_chrome calls are blocking, so every trait method hops onto
//! the blocking pool with `spawn_blocking`. The `Tab` handle is shared via
//! `Arc` and the owning `Browser` is kept alive for the driver's lifetime.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use formpilot_core_types::Viewport;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::Rng;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{BrowserDriver, SelectTarget};
use crate::errors::DriverError;

const NAVIGATE_ATTEMPTS: u32 = 3;
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for launching the managed Chrome instance.
#[derive(Clone, Debug)]
pub struct ChromeDriverConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub screenshots_dir: PathBuf,
    /// Randomized settle delay applied after mutating actions, in milliseconds.
    /// Government portals throttle aggressively; pacing keeps sessions alive.
    pub settle_ms: (u64, u64),
}

impl Default for ChromeDriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            screenshots_dir: PathBuf::from("screenshots"),
            settle_ms: (2000, 3000),
        }
    }
}

pub struct ChromeDriver {
    // Keeps the Chrome process alive; never used directly after launch.
    _browser: Browser,
    tab: Arc<Tab>,
    config: ChromeDriverConfig,
}

impl ChromeDriver {
    pub fn launch(config: ChromeDriverConfig) -> Result<Self, DriverError> {
        std::fs::create_dir_all(&config.screenshots_dir)
            .map_err(|e| DriverError::Launch(format!("screenshots dir: {e}")))?;

        let options = LaunchOptions {
            headless: config.headless,
            window_size: Some((config.viewport.width, config.viewport.height)),
            args: vec![
                std::ffi::OsStr::new("--no-first-run"),
                std::ffi::OsStr::new("--no-default-browser-check"),
                std::ffi::OsStr::new("--disable-blink-features=AutomationControlled"),
            ],
            idle_browser_timeout: Duration::from_secs(300),
            ..Default::default()
        };

        let browser =
            Browser::new(options).map_err(|e| DriverError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        Ok(Self {
            _browser: browser,
            tab,
            config,
        })
    }

    async fn settle(&self) {
        let (lo, hi) = self.config.settle_ms;
        if hi == 0 {
            return;
        }
        let wait = rand::thread_rng().gen_range(lo..=hi.max(lo));
        tokio::time::sleep(Duration::from_millis(wait)).await;
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, DriverError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Tab>) -> Result<T, DriverError> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(tab))
            .await
            .map_err(|e| DriverError::internal(format!("driver task join: {e}")))?
    }
}

fn js_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

fn eval_value(tab: &Tab, script: &str) -> Result<Value, DriverError> {
    let object = tab
        .evaluate(script, false)
        .map_err(|e| DriverError::Script(e.to_string()))?;
    Ok(object.value.unwrap_or(Value::Null))
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let target = url.to_string();
        for attempt in 1..=NAVIGATE_ATTEMPTS {
            let url = target.clone();
            let result = self
                .blocking(move |tab| {
                    tab.navigate_to(&url)
                        .map_err(|e| DriverError::NavigationTimeout {
                            url: format!("{url}: {e}"),
                        })?;
                    tab.wait_for_element("body").map_err(|e| {
                        DriverError::NavigationTimeout {
                            url: format!("{url}: {e}"),
                        }
                    })?;
                    Ok(())
                })
                .await;

            match result {
                Ok(()) => {
                    debug!(url = %target, attempt, "navigation complete");
                    self.settle().await;
                    return Ok(());
                }
                Err(err) if attempt < NAVIGATE_ATTEMPTS => {
                    warn!(url = %target, attempt, %err, "navigation failed, retrying");
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt) * 3)).await;
                }
                Err(err) => return Err(err),
            }
        }
        unreachable!("navigation loop always returns")
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let sel = selector.to_string();
        self.blocking(move |tab| {
            let element = tab
                .wait_for_element_with_custom_timeout(&sel, ELEMENT_TIMEOUT)
                .map_err(|_| DriverError::selector(&sel))?;
            element
                .click()
                .map_err(|e| DriverError::internal(format!("click {sel}: {e}")))?;
            Ok(())
        })
        .await?;
        self.settle().await;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        let sel = selector.to_string();
        let value = value.to_string();
        self.blocking(move |tab| {
            let element = tab
                .wait_for_element_with_custom_timeout(&sel, ELEMENT_TIMEOUT)
                .map_err(|_| DriverError::selector(&sel))?;
            element
                .click()
                .map_err(|e| DriverError::internal(format!("focus {sel}: {e}")))?;
            let clear = format!(
                "document.querySelector('{}').value = ''",
                js_escape(&sel)
            );
            eval_value(&tab, &clear)?;
            tab.type_str(&value)
                .map_err(|e| DriverError::internal(format!("type into {sel}: {e}")))?;
            Ok(())
        })
        .await?;
        self.settle().await;
        Ok(())
    }

    async fn select_option(
        &self,
        selector: &str,
        target: &SelectTarget,
    ) -> Result<(), DriverError> {
        let sel = selector.to_string();
        let value = target.value.clone().unwrap_or_default();
        let label = target.label.clone().unwrap_or_default();
        self.blocking(move |tab| {
            // Match by option value first, then by visible text; dispatch a
            // change event so cascading dropdowns react.
            let script = format!(
                r#"(function() {{
                    const sel = document.querySelector('{sel}');
                    if (!sel) return 'NO_ELEMENT';
                    const opts = Array.from(sel.options);
                    const value = '{value}';
                    const label = '{label}'.trim().toLowerCase();
                    let match = value ? opts.find(o => o.value === value) : null;
                    if (!match && label) {{
                        match = opts.find(o => o.text.trim().toLowerCase() === label);
                    }}
                    if (!match && label) {{
                        match = opts.find(o => o.text.trim().toLowerCase().includes(label));
                    }}
                    if (!match) return 'NOT_FOUND';
                    sel.value = match.value;
                    sel.dispatchEvent(new Event('change', {{bubbles: true}}));
                    return 'OK';
                }})()"#,
                sel = js_escape(&sel),
                value = js_escape(&value),
                label = js_escape(&label),
            );
            match eval_value(&tab, &script)?.as_str() {
                Some("OK") => Ok(()),
                Some("NO_ELEMENT") => Err(DriverError::selector(&sel)),
                _ => Err(DriverError::Script(format!(
                    "no option matching value='{value}' label='{label}' in {sel}"
                ))),
            }
        })
        .await?;
        self.settle().await;
        Ok(())
    }

    async fn screenshot(&self, name: &str) -> Result<PathBuf, DriverError> {
        let path = self.config.screenshots_dir.join(format!("{name}.png"));
        let out = path.clone();
        self.blocking(move |tab| {
            let bytes = tab
                .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(|e| DriverError::Screenshot(e.to_string()))?;
            std::fs::write(&out, bytes).map_err(|e| DriverError::Screenshot(e.to_string()))?;
            Ok(out)
        })
        .await
    }

    async fn get_text(&self, selector: &str) -> Result<String, DriverError> {
        let script = format!(
            "(document.querySelector('{}') || {{}}).innerText || ''",
            js_escape(selector)
        );
        let value = self.evaluate(&script).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        let script = script.to_string();
        self.blocking(move |tab| eval_value(&tab, &script)).await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.blocking(move |tab| Ok(tab.get_url())).await
    }

    fn viewport(&self) -> Viewport {
        self.config.viewport
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), DriverError> {
        // headless_chrome has no public mouse API; resolve the element at the
        // coordinate and drive it through the DOM instead.
        let script = format!(
            r#"(function() {{
                const el = document.elementFromPoint({x}, {y});
                if (!el) return false;
                el.focus && el.focus();
                el.click && el.click();
                return true;
            }})()"#
        );
        match self.evaluate(&script).await?.as_bool() {
            Some(true) => {
                self.settle().await;
                Ok(())
            }
            _ => Err(DriverError::Script(format!(
                "no element at point ({x}, {y})"
            ))),
        }
    }

    async fn type_text(&self, text: &str) -> Result<(), DriverError> {
        let text = text.to_string();
        self.blocking(move |tab| {
            tab.type_str(&text)
                .map_err(|e| DriverError::internal(format!("type text: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        let key = key.to_string();
        self.blocking(move |tab| {
            tab.press_key(&key)
                .map_err(|e| DriverError::internal(format!("press {key}: {e}")))?;
            Ok(())
        })
        .await
    }
}
