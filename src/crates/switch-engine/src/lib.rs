//! Rule evaluation and dispatch engine for the dynamic switch node
//!
//! Routes each record of a batch into one or more of a bounded set of
//! numbered output channels, either by a directly supplied channel index
//! (expression mode) or by walking an ordered list of comparison rules
//! against a per-record value (rules mode).
//!
//! The engine talks to its host through [`host::ParameterHost`]: parameters
//! are read by name and item index, and the host decides whether a failing
//! record aborts the batch or is turned into a diagnostic record.

pub mod channel;
pub mod config;
pub mod executor;
pub mod host;
pub mod resolver;
pub mod router;
pub mod value;

pub use channel::{Channel, Channels, PairedItem, Record};
pub use config::{
    DataType, MatchStrategy, Mode, NodeDefinition, RoutingConfig, RuleEntry, SwitchSettings,
};
pub use executor::{route_batch, BatchSummary, NodeExecutor, RoutedBatch, SwitchNode};
pub use host::{ParameterHost, StaticHost};
pub use router::{Dispatcher, Operator, Placement, RuleEvaluator};
pub use value::ScalarValue;

use thiserror::Error;

/// Errors that can occur while routing a batch
#[derive(Debug, Error)]
pub enum SwitchError {
    /// A date-time operand could not be parsed from any accepted form
    #[error("Invalid DateTime value: \"{0}\"")]
    InvalidDateTime(String),

    /// A resolved channel index is outside `[0, channel count)`
    #[error("Output index {} is out of range. Must be between 0 and {max}.", display_index(.index))]
    OutOfRange { index: f64, max: usize },

    /// A rule names an operation that the active data type does not support
    #[error("Unknown operation: {operation}")]
    UnknownOperator {
        operation: String,
        data_type: DataType,
    },

    /// A host-supplied parameter has the wrong shape or an unknown value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A record failed and the host does not continue on failure
    #[error("Node '{node}' failed on item {item_index}: {source}")]
    ItemFailed {
        node: String,
        item_index: usize,
        source: Box<SwitchError>,
    },

    /// Node definition or settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Settings layer error
    #[error("Settings error: {0}")]
    Settings(#[from] tooling::ToolingError),
}

impl SwitchError {
    /// The error that caused a record to fail, looking through attribution
    pub fn root(&self) -> &SwitchError {
        match self {
            SwitchError::ItemFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

fn display_index(index: &f64) -> String {
    value::format_number(*index)
}

/// Result type for switch operations
pub type Result<T> = std::result::Result<T, SwitchError>;

/// Get version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
