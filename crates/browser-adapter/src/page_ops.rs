//! Page-level helpers built on top of the driver primitives.
//!
//! These are the site-agnostic chores every portal run needs: overlay
//! dismissal, language switching, captcha probing, scroll reset. Callers
//! gate them on the active site recipe's flags.

use serde_json::Value;
use tracing::debug;

use crate::api::{BrowserDriver, SelectTarget};
use crate::errors::DriverError;

const MODAL_HIDE_JS: &str = r#"
(function() {
    let removed = 0;
    document.querySelectorAll(
        '.modal, .modal-backdrop, #exampleModal, [id*="modal"]'
    ).forEach(el => {
        el.style.display = 'none';
        el.classList.remove('show', 'modal-show', 'fade');
        removed++;
    });
    document.body.classList.remove('modal-open');
    document.body.style.overflow = 'auto';
    document.body.style.paddingRight = '';
    return removed;
})()"#;

const MODAL_CLOSE_SELECTORS: &[&str] = &[
    "button.close",
    "[aria-label='Close']",
    ".modal-header .close",
    "button[data-dismiss='modal']",
    ".btn-close",
];

const CAPTCHA_SELECTORS: &[&str] = &[
    "img[src*='captcha']",
    "img[src*='Captcha']",
    "img[id*='captcha']",
    "img[id*='Captcha']",
    "canvas[id*='captcha']",
    "#captchaImg",
    ".captcha-img",
    "[class*='captcha'] img",
];

/// Hide any homepage overlay/modal. JS removal first (reliable on Bootstrap
/// style modals), close-button click chain as fallback. Never fails: a page
/// without a modal is the common case.
pub async fn dismiss_modal(driver: &dyn BrowserDriver) {
    match driver.evaluate(MODAL_HIDE_JS).await {
        Ok(Value::Number(n)) if n.as_u64().unwrap_or(0) > 0 => {
            debug!(hidden = %n, "modal dismissed via JS");
            return;
        }
        Ok(_) => {}
        Err(err) => debug!(%err, "JS modal dismissal attempted"),
    }

    for sel in MODAL_CLOSE_SELECTORS {
        if is_visible(driver, sel).await {
            if driver.click(sel).await.is_ok() {
                debug!(selector = sel, "modal closed via click");
                return;
            }
        }
    }
    debug!("no modal found (or already closed)");
}

/// Switch the portal language via its language dropdown.
pub async fn set_language(driver: &dyn BrowserDriver, lang: &str) -> Result<(), DriverError> {
    driver
        .select_option("#ddlLanguage", &SelectTarget::by_label(lang))
        .await
}

/// True when a captcha element is visible on the current page.
pub async fn detect_captcha(driver: &dyn BrowserDriver) -> bool {
    for sel in CAPTCHA_SELECTORS {
        if is_visible(driver, sel).await {
            debug!(selector = sel, "captcha detected");
            return true;
        }
    }
    false
}

pub async fn scroll_to_top(driver: &dyn BrowserDriver) {
    let _ = driver.evaluate("window.scrollTo(0, 0)").await;
}

/// Visibility probe via rendered-box check; errors count as not visible.
pub async fn is_visible(driver: &dyn BrowserDriver, selector: &str) -> bool {
    let script = format!(
        r#"(function() {{
            const el = document.querySelector('{}');
            return !!(el && (el.offsetWidth || el.offsetHeight || el.getClientRects().length));
        }})()"#,
        selector.replace('\\', "\\\\").replace('\'', "\\'")
    );
    matches!(driver.evaluate(&script).await, Ok(Value::Bool(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{DriverCall, ScriptedDriver};
    use serde_json::json;

    #[tokio::test]
    async fn js_removal_short_circuits_click_chain() {
        let driver = ScriptedDriver::new();
        driver.push_eval_result(json!(2));
        dismiss_modal(&driver).await;
        assert_eq!(driver.call_count(|c| matches!(c, DriverCall::Click(_))), 0);
    }

    #[tokio::test]
    async fn captcha_probe_checks_selector_battery() {
        let driver = ScriptedDriver::new();
        // First selector probe misses, second hits.
        driver.push_eval_result(json!(false));
        driver.push_eval_result(json!(true));
        assert!(detect_captcha(&driver).await);
    }

    #[tokio::test]
    async fn captcha_probe_negative_when_nothing_visible() {
        let driver = ScriptedDriver::new();
        assert!(!detect_captcha(&driver).await);
    }
}
