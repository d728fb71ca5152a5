//! Tooling utilities shared across the dynswitch workspace
//!
//! # Modules
//!
//! - `config` - `ConfigBuilder` trait and environment variable helpers
//! - `logging` - Subscriber setup, scope timing guards and formatters

pub mod config;
pub mod logging;

use thiserror::Error;

/// Errors that can occur in the tooling crate
#[derive(Debug, Error)]
pub enum ToolingError {
    /// General error with message
    #[error("Tooling error: {0}")]
    General(String),

    /// Invalid configuration value
    #[error("Invalid configuration for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },
}

/// Result type for tooling operations
pub type Result<T> = std::result::Result<T, ToolingError>;

/// Get version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_invalid_config_message() {
        let err = ToolingError::InvalidConfig {
            key: "DYNSWITCH_LOG_FORMAT".to_string(),
            reason: "unknown format 'xml'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration for DYNSWITCH_LOG_FORMAT: unknown format 'xml'"
        );
    }
}
