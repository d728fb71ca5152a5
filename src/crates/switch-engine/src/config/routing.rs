//! Batch-wide routing configuration
//!
//! Everything that must stay fixed for a whole batch (channel count, mode,
//! data type, match strategy, failure policy) is resolved once from the
//! first item's parameters into an immutable [`RoutingConfig`].

use crate::host::ParameterHost;
use crate::value::ScalarValue;
use crate::{Result, SwitchError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Smallest number of output channels
pub const MIN_CHANNELS: usize = 1;
/// Largest number of output channels
pub const MAX_CHANNELS: usize = 50;
/// Channel count used when none is configured
pub const DEFAULT_CHANNELS: usize = 2;
/// Fallback value that drops unrouted records
pub const DROP_FALLBACK: f64 = -1.0;

/// Parameter names understood by the engine
pub mod params {
    pub const NUMBER_OF_OUTPUTS: &str = "numberOfOutputs";
    pub const OUTPUT_LABELS: &str = "outputLabels";
    pub const MODE: &str = "mode";
    pub const EXPRESSION_OUTPUT: &str = "expressionOutput";
    pub const DATA_TYPE: &str = "dataType";
    pub const MATCH_STRATEGY: &str = "matchStrategy";
    pub const CASE_INSENSITIVE: &str = "caseInsensitive";
    pub const FALLBACK_OUTPUT: &str = "fallbackOutput";
}

/// How the target channel of a record is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    /// The host supplies a channel index per record
    Expression,
    /// Ordered comparison rules pick the channel(s)
    #[default]
    Rules,
}

/// Type of the values compared by rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Boolean,
    DateTime,
    #[default]
    Number,
    String,
}

impl DataType {
    /// Parameter holding the left-hand value for this type
    pub fn left_parameter(&self) -> &'static str {
        match self {
            DataType::Boolean => "value1Boolean",
            DataType::DateTime => "value1DateTime",
            DataType::Number => "value1Number",
            DataType::String => "value1String",
        }
    }

    /// Parameter holding the rule list for this type
    pub fn rules_parameter(&self) -> &'static str {
        match self {
            DataType::Boolean => "rulesBoolean.rules",
            DataType::DateTime => "rulesDateTime.rules",
            DataType::Number => "rulesNumber.rules",
            DataType::String => "rulesString.rules",
        }
    }

    /// Operation assumed when a rule omits one
    pub fn default_operation(&self) -> &'static str {
        match self {
            DataType::DateTime => "after",
            DataType::Boolean | DataType::Number | DataType::String => "equal",
        }
    }

    /// Value assumed when a left or right operand is omitted
    pub fn default_value(&self) -> ScalarValue {
        match self {
            DataType::Boolean => ScalarValue::Bool(false),
            DataType::Number => ScalarValue::Number(0.0),
            DataType::DateTime | DataType::String => ScalarValue::String(String::new()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "boolean"),
            DataType::DateTime => write!(f, "dateTime"),
            DataType::Number => write!(f, "number"),
            DataType::String => write!(f, "string"),
        }
    }
}

/// Whether a record stops at the first matching rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStrategy {
    #[default]
    First,
    All,
}

/// Resolved configuration for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    node_name: String,
    continue_on_fail: bool,
    mode: Mode,
    data_type: DataType,
    match_strategy: MatchStrategy,
    labels: Vec<String>,
}

impl RoutingConfig {
    /// Read the batch-wide parameters from the first item's context
    pub fn resolve(host: &dyn ParameterHost) -> Result<Self> {
        let requested = host.parameter(params::NUMBER_OF_OUTPUTS, 0)?;
        let channel_count = resolve_channel_count(requested.as_ref());

        let raw_labels = match host.parameter(params::OUTPUT_LABELS, 0)? {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };

        let mode = read_choice(host, params::MODE)?;
        let (data_type, match_strategy) = match mode {
            Mode::Rules => (
                read_choice(host, params::DATA_TYPE)?,
                read_choice(host, params::MATCH_STRATEGY)?,
            ),
            Mode::Expression => (DataType::default(), MatchStrategy::default()),
        };

        Ok(Self {
            node_name: host.node_name().to_string(),
            continue_on_fail: host.continue_on_fail(),
            mode,
            data_type,
            match_strategy,
            labels: output_labels(&raw_labels, channel_count),
        })
    }

    /// Build a configuration directly, mostly for tests and embedding
    pub fn new(channel_count: usize, mode: Mode) -> Self {
        let count = channel_count.clamp(MIN_CHANNELS, MAX_CHANNELS);
        Self {
            node_name: crate::config::DEFAULT_NODE_NAME.to_string(),
            continue_on_fail: false,
            mode,
            data_type: DataType::default(),
            match_strategy: MatchStrategy::default(),
            labels: output_labels("", count),
        }
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_match_strategy(mut self, match_strategy: MatchStrategy) -> Self {
        self.match_strategy = match_strategy;
        self
    }

    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn match_strategy(&self) -> MatchStrategy {
        self.match_strategy
    }

    /// Number of output channels, always within `1..=50`
    pub fn channel_count(&self) -> usize {
        self.labels.len()
    }

    /// Display label of every channel, one per channel
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Clamp a requested channel count into `1..=50`
///
/// Fractions round down. A missing or non-numeric request yields the
/// default of two channels.
pub fn resolve_channel_count(requested: Option<&Value>) -> usize {
    let n = match requested {
        None | Some(Value::Null) => return DEFAULT_CHANNELS,
        Some(value) => ScalarValue::from(value).to_number(),
    };
    if n.is_nan() {
        return DEFAULT_CHANNELS;
    }

    n.floor()
        .clamp(MIN_CHANNELS as f64, MAX_CHANNELS as f64) as usize
}

/// Channel labels from a comma-separated list
///
/// Blank entries are skipped, so later labels shift left. Channels without
/// a label are called `Route {index}`.
pub fn output_labels(raw: &str, channel_count: usize) -> Vec<String> {
    let parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    (0..channel_count)
        .map(|i| match parts.get(i) {
            Some(label) => label.to_string(),
            None => format!("Route {}", i),
        })
        .collect()
}

/// Read an enumerated batch-level parameter; missing or empty means default
fn read_choice<T>(host: &dyn ParameterHost, name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match host.parameter(name, 0)? {
        None | Some(Value::Null) => Ok(T::default()),
        Some(Value::String(s)) if s.is_empty() => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|_| SwitchError::InvalidParameter {
                name: name.to_string(),
                reason: format!("unsupported value {}", value),
            })
        }
    }
}
