use serde_json::{Map, Value};

/// Running key-value state of a plan execution.
///
/// Successful steps write into it (page info, screenshot paths, task handler
/// output); later writes overwrite earlier ones under the same key. It also
/// feeds `{key}` template substitution in later `fill` values.
#[derive(Clone, Debug, Default)]
pub struct ResultAccumulator {
    map: Map<String, Value>,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.map.insert(key.into(), value);
    }

    pub fn merge(&mut self, other: Map<String, Value>) {
        for (key, value) in other {
            self.map.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }

    /// Replace every `{key}` placeholder with the accumulated value for that
    /// key. Unknown placeholders are left untouched. String values substitute
    /// bare, everything else as compact JSON.
    pub fn substitute(&self, template: &str) -> String {
        let mut out = template.to_string();
        for (key, value) in &self.map {
            let needle = format!("{{{key}}}");
            if !out.contains(&needle) {
                continue;
            }
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out = out.replace(&needle, &rendered);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn later_writes_overwrite() {
        let mut results = ResultAccumulator::new();
        results.insert("screenshot", json!("a.png"));
        results.insert("screenshot", json!("b.png"));
        assert_eq!(results.get("screenshot"), Some(&json!("b.png")));
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn substitutes_known_placeholders_only() {
        let mut results = ResultAccumulator::new();
        results.insert("otp", json!("4417"));
        results.insert("attempts", json!(2));
        assert_eq!(
            results.substitute("code {otp} try {attempts} keep {missing}"),
            "code 4417 try 2 keep {missing}"
        );
    }

    #[test]
    fn merge_brings_handler_output_in() {
        let mut results = ResultAccumulator::new();
        results.insert("kept", json!(true));
        let mut extra = Map::new();
        extra.insert("receipt".to_string(), json!("R-99"));
        results.merge(extra);
        assert!(results.contains_key("kept"));
        assert_eq!(results.get("receipt"), Some(&json!("R-99")));
    }
}
