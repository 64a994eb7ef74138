//! Per-tab view state kept for the lifetime of the process, so switching tabs does
//! not lose filters and half-filled forms.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

#[derive(Clone, Default)]
pub struct TabStateCache {
    tabs: Arc<RwLock<HashMap<String, Value>>>,
}

impl TabStateCache {
    pub fn new() -> Self { Self::default() }

    pub fn save_tab_data(&self, tab: &str, data: Value) {
        self.tabs.write().insert(tab.to_string(), data);
    }

    /// Saved state for `tab`, or an empty object.
    pub fn get_tab_data(&self, tab: &str) -> Value {
        self.tabs.read().get(tab).cloned().unwrap_or_else(|| Value::Object(Map::new()))
    }

    pub fn tabs(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tabs.read().keys().cloned().collect();
        names.sort();
        names
    }
}
