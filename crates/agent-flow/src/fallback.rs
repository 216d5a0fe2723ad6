//! Visual fallback operations, used when a structural selector is unknown or
//! keeps failing. Each operation screenshots the page, asks the locator for
//! coordinates, and drives the mouse/keyboard instead of the DOM.

use browser_adapter::BrowserDriver;
use tracing::info;
use vision_locator::{LocatedPoint, VisualLocator};

use crate::errors::FlowError;

const FOCUS_SELECT_ALL_JS: &str = r#"
(function () {
  const el = document.activeElement;
  if (el && typeof el.select === "function") { el.select(); }
  return true;
})()
"#;

async fn locate(
    driver: &dyn BrowserDriver,
    locator: &dyn VisualLocator,
    description: &str,
) -> Result<LocatedPoint, FlowError> {
    let viewport = driver.viewport();
    let shot = driver.screenshot("vision_locate").await?;
    let answer = locator
        .locate(&shot, description, viewport)
        .await
        .map_err(|e| FlowError::VisualLocateFailed(e.to_string()))?;
    match answer {
        // The bounds check lives here, not in the locator impls: a point
        // outside the viewport must never reach the mouse.
        Some(point) if viewport.contains(point.x, point.y) => Ok(point),
        Some(point) => Err(FlowError::VisualLocateFailed(format!(
            "'{description}' reported outside the viewport at ({}, {})",
            point.x, point.y
        ))),
        None => Err(FlowError::VisualLocateFailed(format!(
            "could not locate '{description}'"
        ))),
    }
}

pub async fn vision_click(
    driver: &dyn BrowserDriver,
    locator: &dyn VisualLocator,
    description: &str,
) -> Result<(), FlowError> {
    let point = locate(driver, locator, description).await?;
    info!(x = point.x, y = point.y, description, "vision click");
    driver.click_at(point.x, point.y).await?;
    Ok(())
}

/// Click the field visually, select its current content, type the value.
pub async fn vision_fill(
    driver: &dyn BrowserDriver,
    locator: &dyn VisualLocator,
    description: &str,
    value: &str,
) -> Result<(), FlowError> {
    let point = locate(driver, locator, description).await?;
    info!(x = point.x, y = point.y, description, "vision fill");
    driver.click_at(point.x, point.y).await?;
    driver.evaluate(FOCUS_SELECT_ALL_JS).await?;
    driver.type_text(value).await?;
    Ok(())
}

/// Click the dropdown visually to focus it, then pick the option on the now
/// focused element by matching text.
pub async fn vision_select(
    driver: &dyn BrowserDriver,
    locator: &dyn VisualLocator,
    description: &str,
    choice: &str,
) -> Result<(), FlowError> {
    let point = locate(driver, locator, description).await?;
    info!(x = point.x, y = point.y, description, choice, "vision select");
    driver.click_at(point.x, point.y).await?;

    let needle = choice.to_lowercase().replace('"', "\\\"");
    let js = format!(
        r#"
(function () {{
  const sel = document.activeElement;
  if (!sel || sel.tagName !== "SELECT") return "NO_ELEMENT";
  const opts = Array.from(sel.options);
  let match = opts.find(o => o.text.trim().toLowerCase() === "{needle}");
  if (!match) match = opts.find(o => o.text.trim().toLowerCase().includes("{needle}"));
  if (!match) return "NOT_FOUND";
  sel.value = match.value;
  sel.dispatchEvent(new Event("change", {{ bubbles: true }}));
  return "OK";
}})()
"#
    );
    let outcome = driver.evaluate(&js).await?;
    match outcome.as_str() {
        Some("OK") => Ok(()),
        other => Err(FlowError::VisualLocateFailed(format!(
            "focused dropdown rejected '{choice}': {}",
            other.unwrap_or("no result")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_adapter::{DriverCall, ScriptedDriver};
    use serde_json::json;
    use vision_locator::MockLocator;

    #[tokio::test]
    async fn click_uses_located_coordinates() {
        let driver = ScriptedDriver::new();
        let locator = MockLocator::new();
        locator.push(Some(LocatedPoint { x: 640.0, y: 412.0 }));

        vision_click(&driver, &locator, "the Apply button")
            .await
            .unwrap();
        assert!(driver
            .calls()
            .contains(&DriverCall::ClickAt { x: 640.0, y: 412.0 }));
    }

    #[tokio::test]
    async fn out_of_viewport_answer_is_not_found() {
        let driver = ScriptedDriver::new();
        let locator = MockLocator::new();
        // Default viewport is 1280x900; this lands outside it.
        locator.push(Some(LocatedPoint {
            x: 5000.0,
            y: 412.0,
        }));

        let err = vision_click(&driver, &locator, "the Apply button")
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::VisualLocateFailed(_)));
        assert_eq!(
            driver.call_count(|c| matches!(c, DriverCall::ClickAt { .. })),
            0
        );
    }

    /// Locator that answers without doing its own bounds filtering.
    struct FixedLocator(LocatedPoint);

    #[async_trait::async_trait]
    impl VisualLocator for FixedLocator {
        async fn locate(
            &self,
            _screenshot: &std::path::Path,
            _description: &str,
            _viewport: formpilot_core_types::Viewport,
        ) -> Result<Option<LocatedPoint>, vision_locator::LocateError> {
            Ok(Some(self.0))
        }
    }

    #[tokio::test]
    async fn unfiltered_locator_answers_are_bounds_checked_here() {
        let driver = ScriptedDriver::new();
        let locator = FixedLocator(LocatedPoint {
            x: 5000.0,
            y: 5000.0,
        });

        let err = vision_click(&driver, &locator, "the Apply button")
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::VisualLocateFailed(_)));
        assert_eq!(
            driver.call_count(|c| matches!(c, DriverCall::ClickAt { .. })),
            0
        );
    }

    #[tokio::test]
    async fn fill_clicks_selects_then_types() {
        let driver = ScriptedDriver::new();
        driver.push_eval_result(json!(true));
        let locator = MockLocator::new();
        locator.push(Some(LocatedPoint { x: 100.0, y: 200.0 }));

        vision_fill(&driver, &locator, "the mobile field", "9876543210")
            .await
            .unwrap();
        let calls = driver.calls();
        let click_pos = calls
            .iter()
            .position(|c| matches!(c, DriverCall::ClickAt { .. }))
            .unwrap();
        let type_pos = calls
            .iter()
            .position(|c| matches!(c, DriverCall::TypeText(t) if t == "9876543210"))
            .unwrap();
        assert!(click_pos < type_pos);
    }

    #[tokio::test]
    async fn select_reports_unmatched_option() {
        let driver = ScriptedDriver::new();
        driver.push_eval_result(json!("NOT_FOUND"));
        let locator = MockLocator::new();
        locator.push(Some(LocatedPoint { x: 10.0, y: 20.0 }));

        let err = vision_select(&driver, &locator, "the season dropdown", "Kharif")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Kharif"));
    }
}
