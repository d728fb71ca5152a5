//! Node definitions: the on-disk form of one configured switch

use crate::config::loader::{load_yaml_config, parse_yaml_config};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Node identity used when neither the definition nor the settings name one
pub const DEFAULT_NODE_NAME: &str = "Dynamic Switch";

/// A configured switch node
///
/// ```yaml
/// name: Temperature router
/// continueOnFail: true
/// parameters:
///   numberOfOutputs: 3
///   outputLabels: "Cold, Warm, Hot"
///   dataType: number
///   value1Number: "{{ $json.temperature }}"
///   rulesNumber:
///     rules:
///       - { operation: smaller, value2: 10, output: 0 }
///       - { operation: largerEqual, value2: 25, output: 2 }
///   fallbackOutput: 1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Node identity for error attribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether failing records become diagnostics instead of aborting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_fail: Option<bool>,
    /// Parameter document handed to the engine
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl NodeDefinition {
    /// Load a definition from a YAML file, resolving includes and variables
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let definition: Self = load_yaml_config(path.as_ref())?;
        tracing::debug!(
            "Loaded node definition {:?} with {} parameters",
            path.as_ref(),
            definition.parameters.len()
        );
        Ok(definition)
    }

    /// Parse a definition from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        parse_yaml_config(content, None)
    }

    /// Set a single parameter
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Parameter document as a JSON value
    pub fn parameters_value(&self) -> Value {
        Value::Object(self.parameters.clone())
    }
}
