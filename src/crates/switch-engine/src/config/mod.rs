//! Configuration module for the switch engine
//!
//! Provides:
//! - batch-wide routing configuration resolved from host parameters
//! - rule entries and rule list parsing
//! - YAML node definitions with file includes and environment expansion
//! - runtime settings layered from environment, TOML and defaults
//! - static checks of a node's rules

pub mod loader;
pub mod node;
pub mod routing;
pub mod rules;
pub mod settings;
pub mod validate;

pub use loader::{load_yaml_config, load_yaml_file, parse_yaml_config};
pub use node::{NodeDefinition, DEFAULT_NODE_NAME};
pub use routing::{
    output_labels, params, resolve_channel_count, DataType, MatchStrategy, Mode, RoutingConfig,
    DEFAULT_CHANNELS, DROP_FALLBACK, MAX_CHANNELS, MIN_CHANNELS,
};
pub use rules::{parse_rule_list, RuleEntry};
pub use settings::{SwitchSettings, ENV_PREFIX};
pub use validate::{lint_rules, RuleIssue};
