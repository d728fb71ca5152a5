//! Boundary with the hosting workflow runtime
//!
//! The engine never evaluates expressions itself. It asks the host for a
//! parameter value by name and item index and gets back plain JSON.

use crate::channel::Record;
use crate::config::{NodeDefinition, SwitchSettings, DEFAULT_NODE_NAME};
use crate::Result;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

/// Accessor for per-record configuration supplied by the host
pub trait ParameterHost: Send + Sync {
    /// Value of parameter `name` as seen by the item at `item_index`
    ///
    /// Dotted names such as `rulesNumber.rules` address nested values.
    /// Returns `Ok(None)` when the parameter is not set.
    fn parameter(&self, name: &str, item_index: usize) -> Result<Option<Value>>;

    /// Whether a failing record becomes a diagnostic instead of aborting
    fn continue_on_fail(&self) -> bool;

    /// Node identity used in error attribution
    fn node_name(&self) -> &str;
}

/// Host backed by a fixed parameter document
///
/// A string parameter of the form `{{ $json.path }}` (optionally prefixed
/// with `=`) reads `path` from the record being routed. Keys are separated
/// by dots and numeric segments index arrays; a missing path reads as null.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    node_name: String,
    continue_on_fail: bool,
    parameters: Value,
    items: Vec<Arc<Value>>,
}

impl StaticHost {
    /// Create a host over a parameter document
    pub fn new(parameters: Value) -> Self {
        Self {
            node_name: DEFAULT_NODE_NAME.to_string(),
            continue_on_fail: false,
            parameters,
            items: Vec::new(),
        }
    }

    /// Create a host for a node definition; unset fields come from `settings`
    pub fn from_definition(definition: &NodeDefinition, settings: &SwitchSettings) -> Self {
        Self {
            node_name: definition
                .name
                .clone()
                .unwrap_or_else(|| settings.node_name().to_string()),
            continue_on_fail: definition
                .continue_on_fail
                .unwrap_or_else(|| settings.continue_on_fail()),
            parameters: definition.parameters_value(),
            items: Vec::new(),
        }
    }

    /// Records that field references resolve against
    pub fn with_items(mut self, items: &[Record]) -> Self {
        self.items = items.iter().map(|record| Arc::clone(&record.json)).collect();
        self
    }

    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }

    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    fn resolve(&self, value: &Value, item: &Value) -> Value {
        match value {
            Value::String(s) => match field_reference(s) {
                Some(path) => lookup_path(item, path).cloned().unwrap_or(Value::Null),
                None => value.clone(),
            },
            Value::Array(values) => {
                Value::Array(values.iter().map(|v| self.resolve(v, item)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve(v, item)))
                    .collect::<Map<String, Value>>(),
            ),
            other => other.clone(),
        }
    }
}

impl ParameterHost for StaticHost {
    fn parameter(&self, name: &str, item_index: usize) -> Result<Option<Value>> {
        let Some(raw) = lookup_path(&self.parameters, name) else {
            return Ok(None);
        };

        let null = Value::Null;
        let item = self
            .items
            .get(item_index)
            .map(|item| item.as_ref())
            .unwrap_or(&null);

        Ok(Some(self.resolve(raw, item)))
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    fn node_name(&self) -> &str {
        &self.node_name
    }
}

/// Value at a dotted path; numeric segments index arrays
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(values) => segment.parse::<usize>().ok().and_then(|i| values.get(i)),
            _ => None,
        })
}

fn field_reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^=?\{\{\s*\$json((?:\.[^.\s{}]+)*)\s*\}\}$").ok())
        .as_ref()
}

/// Path named by a `{{ $json.path }}` reference; empty for the whole record
fn field_reference(s: &str) -> Option<&str> {
    if !s.contains("{{") {
        return None;
    }
    let caps = field_reference_pattern()?.captures(s)?;
    caps.get(1).map(|m| m.as_str())
}
