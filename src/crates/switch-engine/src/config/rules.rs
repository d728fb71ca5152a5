//! Rule entries as supplied by the host
//!
//! Entries stay loosely typed until evaluation so that a single malformed
//! rule fails only the record being routed, not the whole batch.

use crate::config::routing::DataType;
use crate::value::ScalarValue;
use crate::{Result, SwitchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `(operation, right value, output)` entry of a rule list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEntry {
    /// Operation name, defaulting per data type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Right-hand value for non-regex operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
    /// Right-hand value for regex operations on strings (`/body/flags`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,
    /// Target channel index, defaulting to 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl RuleEntry {
    /// Create a rule entry
    pub fn new(operation: impl Into<String>, value2: Value, output: usize) -> Self {
        Self {
            operation: Some(operation.into()),
            value2: Some(value2),
            pattern: None,
            output: Some(Value::from(output)),
        }
    }

    /// Create a regex rule entry reading its right value from `pattern`
    pub fn regex(operation: impl Into<String>, pattern: impl Into<String>, output: usize) -> Self {
        Self {
            operation: Some(operation.into()),
            value2: None,
            pattern: Some(Value::String(pattern.into())),
            output: Some(Value::from(output)),
        }
    }

    /// Operation name, or the data type's default when omitted
    pub fn operation_name(&self, data_type: DataType) -> &str {
        self.operation
            .as_deref()
            .unwrap_or_else(|| data_type.default_operation())
    }

    /// Raw right-hand operand, before normalization
    ///
    /// Regex operations read `pattern`; everything else reads `value2`.
    pub fn right_value(&self, data_type: DataType, regex: bool) -> ScalarValue {
        let field = if regex { &self.pattern } else { &self.value2 };
        match field {
            Some(value) => ScalarValue::from(value),
            None if regex => ScalarValue::String(String::new()),
            None => data_type.default_value(),
        }
    }

    /// Target channel index, floored; `NaN` when not numeric
    pub fn target(&self) -> f64 {
        match &self.output {
            Some(value) => ScalarValue::from(value).to_number().floor(),
            None => 0.0,
        }
    }
}

/// Parse a rule list parameter; a missing list is empty
pub fn parse_rule_list(name: &str, raw: Option<Value>) -> Result<Vec<RuleEntry>> {
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value @ Value::Array(_)) => {
            serde_json::from_value(value).map_err(|e| SwitchError::InvalidParameter {
                name: name.to_string(),
                reason: e.to_string(),
            })
        }
        Some(other) => Err(SwitchError::InvalidParameter {
            name: name.to_string(),
            reason: format!("expected a list of rules, got {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_defaults() {
        let rule = RuleEntry::default();
        assert_eq!(rule.operation_name(DataType::Number), "equal");
        assert_eq!(rule.operation_name(DataType::DateTime), "after");
    }

    #[test]
    fn test_right_value_selection() {
        let rule = RuleEntry {
            operation: Some("regex".to_string()),
            value2: Some(json!("ignored")),
            pattern: Some(json!("/a+/")),
            output: None,
        };

        assert_eq!(rule.right_value(DataType::String, true), ScalarValue::from("/a+/"));
        assert_eq!(rule.right_value(DataType::String, false), ScalarValue::from("ignored"));
    }

    #[test]
    fn test_right_value_defaults() {
        let rule = RuleEntry::default();
        assert_eq!(rule.right_value(DataType::Number, false), ScalarValue::Number(0.0));
        assert_eq!(rule.right_value(DataType::Boolean, false), ScalarValue::Bool(false));
        assert_eq!(rule.right_value(DataType::String, true), ScalarValue::from(""));
    }

    #[test]
    fn test_target_is_floored() {
        assert_eq!(RuleEntry::new("equal", json!(1), 2).target(), 2.0);
        let fractional = RuleEntry {
            output: Some(json!(1.7)),
            ..RuleEntry::default()
        };
        assert_eq!(fractional.target(), 1.0);
        assert_eq!(RuleEntry::default().target(), 0.0);
        let bogus = RuleEntry {
            output: Some(json!("left")),
            ..RuleEntry::default()
        };
        assert!(bogus.target().is_nan());
    }

    #[test]
    fn test_parse_rule_list() {
        let rules = parse_rule_list(
            "rulesNumber.rules",
            Some(json!([
                { "operation": "larger", "value2": 3, "output": 1 },
                { "operation": "smaller", "value2": 0 }
            ])),
        )
        .unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0], RuleEntry::new("larger", json!(3), 1));
        assert_eq!(rules[1].target(), 0.0);
    }

    #[test]
    fn test_parse_rule_list_missing_is_empty() {
        assert!(parse_rule_list("rulesNumber.rules", None).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rule_list_rejects_scalars() {
        let err = parse_rule_list("rulesNumber.rules", Some(json!(5))).unwrap_err();
        assert!(matches!(err, SwitchError::InvalidParameter { .. }));
    }
}
