use browser_adapter::BrowserDriver;
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{DomElement, DomSnapshot};
use crate::probe::PROBE_JS;

/// Snapshot extractor over the driver boundary.
///
/// `snapshot` never fails: any probe or parse trouble is logged and yields an
/// empty snapshot, which the reasoning loop treats as "nothing interactable
/// right now" and re-observes on its next iteration.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomPerceiver;

impl DomPerceiver {
    pub fn new() -> Self {
        Self
    }

    pub async fn snapshot(&self, driver: &dyn BrowserDriver) -> DomSnapshot {
        let raw = match driver.evaluate(PROBE_JS).await {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "DOM probe failed");
                return DomSnapshot::empty();
            }
        };

        match Self::parse(raw) {
            Ok(snapshot) => {
                debug!(elements = snapshot.len(), "DOM snapshot captured");
                snapshot
            }
            Err(err) => {
                warn!(%err, "DOM probe returned unparseable payload");
                DomSnapshot::empty()
            }
        }
    }

    fn parse(raw: Value) -> Result<DomSnapshot, serde_json::Error> {
        if raw.is_null() {
            return Ok(DomSnapshot::empty());
        }
        let elements: Vec<DomElement> = serde_json::from_value(raw)?;
        Ok(DomSnapshot { elements })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_adapter::ScriptedDriver;
    use serde_json::json;

    #[tokio::test]
    async fn parses_probe_payload() {
        let driver = ScriptedDriver::new();
        driver.push_eval_result(json!([
            {"kind": "input", "label": "Mobile No", "selector": "[data-agent-id=\"fp-1\"]",
             "inputType": "text", "isCaptcha": false},
            {"kind": "button", "label": "Submit", "selector": "[data-agent-id=\"fp-2\"]"}
        ]));
        let snapshot = DomPerceiver::new().snapshot(&driver).await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.elements[0].label, "Mobile No");
    }

    #[tokio::test]
    async fn malformed_payload_yields_empty_snapshot() {
        let driver = ScriptedDriver::new();
        driver.push_eval_result(json!({"not": "an array"}));
        let snapshot = DomPerceiver::new().snapshot(&driver).await;
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn null_payload_yields_empty_snapshot() {
        let driver = ScriptedDriver::new();
        let snapshot = DomPerceiver::new().snapshot(&driver).await;
        assert!(snapshot.is_empty());
    }
}
