//! Deterministic driver double.
//!
//! Records every primitive call and lets tests inject failures per selector
//! or URL and queue canned `evaluate` results. Mirrors what the real driver
//! does with state the rest of the stack can observe: navigation updates the
//! current URL, screenshots return stable paths.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use async_trait::async_trait;
use formpilot_core_types::Viewport;
use parking_lot::Mutex;
use serde_json::Value;

use crate::api::{BrowserDriver, SelectTarget};
use crate::errors::DriverError;

/// One recorded driver invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum DriverCall {
    Navigate(String),
    Click(String),
    Fill { selector: String, value: String },
    Select { selector: String, choice: String },
    Screenshot(String),
    GetText(String),
    Evaluate,
    ClickAt { x: f64, y: f64 },
    TypeText(String),
    PressKey(String),
}

#[derive(Default)]
struct Inner {
    calls: Vec<DriverCall>,
    current_url: String,
    eval_queue: VecDeque<Value>,
    // selector -> remaining failures (usize::MAX means always fail)
    failing_selectors: HashMap<String, usize>,
    failing_navigations: HashMap<String, usize>,
}

#[derive(Default)]
pub struct ScriptedDriver {
    inner: Mutex<Inner>,
    viewport: Viewport,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make operations targeting `selector` fail `times` times with
    /// `SelectorNotFound`, then succeed.
    pub fn fail_selector(&self, selector: &str, times: usize) {
        self.inner
            .lock()
            .failing_selectors
            .insert(selector.to_string(), times);
    }

    pub fn fail_selector_always(&self, selector: &str) {
        self.fail_selector(selector, usize::MAX);
    }

    /// Make navigations to URLs containing `fragment` fail `times` times.
    pub fn fail_navigation(&self, fragment: &str, times: usize) {
        self.inner
            .lock()
            .failing_navigations
            .insert(fragment.to_string(), times);
    }

    /// Queue the value the next `evaluate` call returns.
    pub fn push_eval_result(&self, value: Value) {
        self.inner.lock().eval_queue.push_back(value);
    }

    pub fn set_current_url(&self, url: &str) {
        self.inner.lock().current_url = url.to_string();
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self, matcher: impl Fn(&DriverCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| matcher(c)).count()
    }

    fn check_selector(inner: &mut Inner, selector: &str) -> Result<(), DriverError> {
        if let Some(remaining) = inner.failing_selectors.get_mut(selector) {
            if *remaining > 0 {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                return Err(DriverError::selector(selector));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Navigate(url.to_string()));
        let failing = inner
            .failing_navigations
            .iter_mut()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .and_then(|(_, remaining)| {
                if *remaining > 0 {
                    if *remaining != usize::MAX {
                        *remaining -= 1;
                    }
                    Some(())
                } else {
                    None
                }
            });
        if failing.is_some() {
            return Err(DriverError::NavigationTimeout {
                url: url.to_string(),
            });
        }
        inner.current_url = url.to_string();
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Click(selector.to_string()));
        Self::check_selector(&mut inner, selector)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Fill {
            selector: selector.to_string(),
            value: value.to_string(),
        });
        Self::check_selector(&mut inner, selector)
    }

    async fn select_option(
        &self,
        selector: &str,
        target: &SelectTarget,
    ) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        let choice = target
            .value
            .clone()
            .or_else(|| target.label.clone())
            .unwrap_or_default();
        inner.calls.push(DriverCall::Select {
            selector: selector.to_string(),
            choice,
        });
        Self::check_selector(&mut inner, selector)
    }

    async fn screenshot(&self, name: &str) -> Result<PathBuf, DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Screenshot(name.to_string()));
        Ok(PathBuf::from(format!("screenshots/{name}.png")))
    }

    async fn get_text(&self, selector: &str) -> Result<String, DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::GetText(selector.to_string()));
        Ok(String::new())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value, DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Evaluate);
        Ok(inner.eval_queue.pop_front().unwrap_or(Value::Null))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.inner.lock().current_url.clone())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), DriverError> {
        self.inner.lock().calls.push(DriverCall::ClickAt { x, y });
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), DriverError> {
        self.inner
            .lock()
            .calls
            .push(DriverCall::TypeText(text.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.inner
            .lock()
            .calls
            .push(DriverCall::PressKey(key.to_string()));
        Ok(())
    }
}
