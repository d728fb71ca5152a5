//! Environment variable loading utilities

use crate::{Result, ToolingError};
use std::env;
use std::str::FromStr;

/// Load an environment variable as a string
///
/// * `Ok(Some(value))` if the variable exists
/// * `Ok(None)` if it doesn't
/// * `Err` if it exists but is not valid UTF-8
pub fn get_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ToolingError::InvalidConfig {
            key: key.to_string(),
            reason: "contains invalid UTF-8".to_string(),
        }),
    }
}

/// Load and parse an environment variable with `FromStr`
pub fn get_env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env(key)? {
        Some(val) => val
            .parse::<T>()
            .map(Some)
            .map_err(|e| ToolingError::InvalidConfig {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Load a boolean environment variable
///
/// Accepts `true/1/yes/on` and `false/0/no/off`, case-insensitively.
pub fn get_env_bool(key: &str) -> Result<Option<bool>> {
    match get_env(key)? {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ToolingError::InvalidConfig {
                key: key.to_string(),
                reason: format!("'{}' is not a boolean", val),
            }),
        },
        None => Ok(None),
    }
}

/// Build a prefixed environment variable name: `("DYNSWITCH_", "log_level")`
/// becomes `DYNSWITCH_LOG_LEVEL`
pub fn build_env_key(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name.to_uppercase())
}
