use serde::{Deserialize, Serialize};

/// Category of an interactable element surfaced to the decision service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Input,
    Select,
    Button,
    Radio,
    Checkbox,
}

/// One non-placeholder option of a `<select>`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectOptionItem {
    pub value: String,
    pub text: String,
}

/// One visible, enabled form element with a selector that stays addressable
/// until the next navigation or DOM mutation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomElement {
    #[serde(rename = "kind")]
    pub kind: ElementKind,
    /// Best-effort inferred caption; empty when nothing nearby qualifies.
    #[serde(default)]
    pub label: String,
    /// Unique locator, injected into the markup when the element has no
    /// natively stable identifier.
    pub selector: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub options: Vec<SelectOptionItem>,
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub is_captcha: bool,
}

/// Ordered sequence of interactable elements, captured in one probe pass.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub elements: Vec<DomElement>,
}

impl DomSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn find_by_selector(&self, selector: &str) -> Option<&DomElement> {
        self.elements.iter().find(|e| e.selector == selector)
    }

    /// Compact JSON for the decision-service prompt.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.elements).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_probe_records_with_partial_fields() {
        let raw = json!([
            {
                "kind": "input",
                "label": "Full Name",
                "selector": "[data-agent-id=\"fp-1\"]",
                "inputType": "text"
            },
            {
                "kind": "select",
                "label": "Season",
                "selector": "[data-agent-id=\"fp-2\"]",
                "value": "",
                "options": [
                    {"value": "01", "text": "Kharif"},
                    {"value": "02", "text": "Rabi"}
                ]
            }
        ]);
        let elements: Vec<DomElement> = serde_json::from_value(raw).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].kind, ElementKind::Input);
        assert!(elements[0].options.is_empty());
        assert_eq!(elements[1].options[0].text, "Kharif");
    }

    #[test]
    fn snapshot_lookup_by_selector() {
        let snapshot = DomSnapshot {
            elements: vec![DomElement {
                kind: ElementKind::Button,
                label: "Submit".into(),
                selector: "#submit".into(),
                value: String::new(),
                input_type: None,
                placeholder: None,
                name: None,
                options: vec![],
                checked: None,
                is_captcha: false,
            }],
        };
        assert!(snapshot.find_by_selector("#submit").is_some());
        assert!(snapshot.find_by_selector("#other").is_none());
    }
}
