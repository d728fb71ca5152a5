//! Static checks of a node's configuration
//!
//! Catches what would otherwise fail only when a record reaches the bad
//! rule: unknown operations, literal targets outside the channel range,
//! unparseable literal dates and patterns that never compile. Values that
//! come from field references are only known per record and are skipped.

use crate::channel::ensure_range;
use crate::config::routing::{params, Mode, RoutingConfig, DROP_FALLBACK};
use crate::config::rules::{parse_rule_list, RuleEntry};
use crate::host::ParameterHost;
use crate::resolver::parse_date_value;
use crate::router::{compile_pattern, Operator};
use crate::value::ScalarValue;
use crate::{DataType, Result};
use serde_json::Value;
use std::fmt;

/// A problem found in the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleIssue {
    /// Rule position in the list, `None` for node-level parameters
    pub position: Option<usize>,
    pub message: String,
}

impl RuleIssue {
    fn node(message: impl Into<String>) -> Self {
        Self {
            position: None,
            message: message.into(),
        }
    }

    fn rule(position: usize, message: impl Into<String>) -> Self {
        Self {
            position: Some(position),
            message: message.into(),
        }
    }
}

impl fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "rule {}: {}", position, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Check the configuration as seen by the first item
///
/// Batch-level errors (unknown mode, data type or match strategy) are
/// returned as `Err`; everything else is collected as issues.
pub fn lint_rules(host: &dyn ParameterHost) -> Result<(RoutingConfig, Vec<RuleIssue>)> {
    let config = RoutingConfig::resolve(host)?;
    let mut issues = Vec::new();

    if config.mode() == Mode::Rules {
        lint_rule_list(host, &config, &mut issues)?;
    }

    if let Some(fallback) = literal_number(host.parameter(params::FALLBACK_OUTPUT, 0)?) {
        if fallback != DROP_FALLBACK {
            if let Err(e) = ensure_range(fallback.floor(), config.channel_count()) {
                issues.push(RuleIssue::node(format!("{}: {}", params::FALLBACK_OUTPUT, e)));
            }
        }
    }

    tracing::debug!(
        "Linted '{}' with {} issue(s)",
        config.node_name(),
        issues.len()
    );

    Ok((config, issues))
}

fn lint_rule_list(
    host: &dyn ParameterHost,
    config: &RoutingConfig,
    issues: &mut Vec<RuleIssue>,
) -> Result<()> {
    let data_type = config.data_type();
    let name = data_type.rules_parameter();

    let rules = match parse_rule_list(name, host.parameter(name, 0)?) {
        Ok(rules) => rules,
        Err(e) => {
            issues.push(RuleIssue::node(e.to_string()));
            return Ok(());
        }
    };

    for (position, rule) in rules.iter().enumerate() {
        lint_rule(position, rule, data_type, config.channel_count(), issues);
    }

    Ok(())
}

fn lint_rule(
    position: usize,
    rule: &RuleEntry,
    data_type: DataType,
    channel_count: usize,
    issues: &mut Vec<RuleIssue>,
) {
    let name = rule.operation_name(data_type);
    if let Err(e) = Operator::parse(name, data_type) {
        issues.push(RuleIssue::rule(position, e.to_string()));
    }

    if !matches!(rule.output, Some(Value::Null)) {
        if let Err(e) = ensure_range(rule.target(), channel_count) {
            issues.push(RuleIssue::rule(position, e.to_string()));
        }
    }

    let regex = Operator::is_regex_name(name, data_type);
    match rule.right_value(data_type, regex) {
        ScalarValue::String(pattern) if regex => {
            if compile_pattern(&pattern).is_none() {
                issues.push(RuleIssue::rule(
                    position,
                    format!("pattern {:?} does not compile and never matches", pattern),
                ));
            }
        }
        ScalarValue::Null => {}
        right if data_type == DataType::DateTime => {
            if let Err(e) = parse_date_value(&right) {
                issues.push(RuleIssue::rule(position, e.to_string()));
            }
        }
        _ => {}
    }
}

fn literal_number(value: Option<Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => None,
        Some(value) => Some(ScalarValue::from(value).to_number()),
    }
}
