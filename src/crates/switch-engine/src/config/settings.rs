//! Runtime settings of the engine
//!
//! Layered as: explicit overrides, then `DYNSWITCH_*` environment variables
//! or a TOML settings file, then built-in defaults.

use crate::config::node::DEFAULT_NODE_NAME;
use crate::{Result, SwitchError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tooling::config::{build_env_key, get_env, get_env_bool, get_env_parse, ConfigBuilder};
use tooling::logging::{LogFormat, LoggingSettings};
use tooling::ToolingError;

/// Environment prefix for [`SwitchSettings::from_env`]
pub const ENV_PREFIX: &str = "DYNSWITCH_";

/// Engine settings that are not part of a node definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SwitchSettings {
    /// Node identity when the definition does not name one
    #[serde(default)]
    pub node_name: Option<String>,
    /// Failure policy when the definition does not set one
    #[serde(default)]
    pub continue_on_fail: Option<bool>,
    /// Default tracing filter
    #[serde(default)]
    pub log_level: Option<String>,
    /// Log output format
    #[serde(default)]
    pub log_format: Option<LogFormat>,
}

impl Default for SwitchSettings {
    fn default() -> Self {
        Self {
            node_name: Some(DEFAULT_NODE_NAME.to_string()),
            continue_on_fail: Some(false),
            log_level: Some("info".to_string()),
            log_format: Some(LogFormat::Compact),
        }
    }
}

impl SwitchSettings {
    /// Empty layer: every field unset
    pub fn unset() -> Self {
        Self {
            node_name: None,
            continue_on_fail: None,
            log_level: None,
            log_format: None,
        }
    }

    /// Load a TOML settings file, filling unset fields from defaults
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SwitchError::Config(format!("Failed to read settings file {:?}: {}", path, e))
        })?;
        let mut settings: Self = toml::from_str(&content).map_err(|e| {
            SwitchError::Config(format!("Failed to parse settings file {:?}: {}", path, e))
        })?;
        settings.merge(Self::default());
        settings.validate()?;
        Ok(settings)
    }

    /// Resolved node name
    pub fn node_name(&self) -> &str {
        self.node_name.as_deref().unwrap_or(DEFAULT_NODE_NAME)
    }

    /// Resolved failure policy
    pub fn continue_on_fail(&self) -> bool {
        self.continue_on_fail.unwrap_or(false)
    }

    /// Settings for the tracing subscriber
    pub fn logging(&self) -> LoggingSettings {
        let defaults = LoggingSettings::default();
        LoggingSettings {
            level: self.log_level.clone().unwrap_or(defaults.level),
            format: self.log_format.unwrap_or(defaults.format),
        }
    }
}

impl ConfigBuilder for SwitchSettings {
    fn validate(&self) -> tooling::Result<()> {
        if matches!(self.node_name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(ToolingError::InvalidConfig {
                key: "node_name".to_string(),
                reason: "must not be blank".to_string(),
            });
        }
        if matches!(self.log_level.as_deref(), Some(level) if level.trim().is_empty()) {
            return Err(ToolingError::InvalidConfig {
                key: "log_level".to_string(),
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }

    fn from_env(prefix: &str) -> tooling::Result<Self> {
        Ok(Self {
            node_name: get_env(&build_env_key(prefix, "node_name"))?,
            continue_on_fail: get_env_bool(&build_env_key(prefix, "continue_on_fail"))?,
            log_level: get_env(&build_env_key(prefix, "log_level"))?,
            log_format: get_env_parse(&build_env_key(prefix, "log_format"))?,
        })
    }

    fn merge(&mut self, other: Self) -> &mut Self {
        self.node_name = self.node_name.take().or(other.node_name);
        self.continue_on_fail = self.continue_on_fail.or(other.continue_on_fail);
        self.log_level = self.log_level.take().or(other.log_level);
        self.log_format = self.log_format.or(other.log_format);
        self
    }
}
