//! YAML loader for node definitions
//!
//! - `$include` directives replace a mapping with the contents of another
//!   file, resolved relative to the including file
//! - `${ENV_VAR:default}` is expanded inside string values
//! - the result is converted to JSON so parameters reach the engine in the
//!   same shape a host would hand them over

use crate::{Result, SwitchError};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Nested `$include` depth at which loading gives up
const MAX_INCLUDE_DEPTH: usize = 16;

/// Load a YAML file with includes resolved and variables expanded
pub fn load_yaml_file<P: AsRef<Path>>(path: P) -> Result<YamlValue> {
    load_yaml_file_at_depth(path.as_ref(), 0)
}

/// Load a YAML file and deserialize it into `T`
pub fn load_yaml_config<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let yaml = load_yaml_file(path)?;
    deserialize_yaml(&yaml)
}

/// Parse YAML text into `T`
///
/// Variables are expanded; `$include` is resolved against `base_dir` when
/// given and rejected otherwise.
pub fn parse_yaml_config<T: DeserializeOwned>(content: &str, base_dir: Option<&Path>) -> Result<T> {
    let mut value: YamlValue = serde_yaml::from_str(content)?;
    match base_dir {
        Some(dir) => process_includes(&mut value, dir, 0)?,
        None => reject_includes(&value)?,
    }
    expand_variables(&mut value);
    deserialize_yaml(&value)
}

fn load_yaml_file_at_depth(path: &Path, depth: usize) -> Result<YamlValue> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(SwitchError::Config(format!(
            "Include depth exceeded while loading {:?}",
            path
        )));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        SwitchError::Config(format!("Failed to read YAML file {:?}: {}", path, e))
    })?;

    let mut value: YamlValue = serde_yaml::from_str(&content).map_err(|e| {
        SwitchError::Config(format!("Failed to parse YAML file {:?}: {}", path, e))
    })?;

    let base_dir = path
        .parent()
        .ok_or_else(|| SwitchError::Config(format!("Invalid file path {:?}", path)))?;

    process_includes(&mut value, base_dir, depth)?;
    expand_variables(&mut value);

    Ok(value)
}

fn deserialize_yaml<T: DeserializeOwned>(yaml: &YamlValue) -> Result<T> {
    let json = yaml_to_json(yaml)?;
    serde_json::from_value(json).map_err(|e| {
        SwitchError::Config(format!("Failed to deserialize node definition: {}", e))
    })
}

fn include_target(value: &YamlValue) -> Option<&str> {
    match value {
        YamlValue::Mapping(map) => match map.get(&YamlValue::String("$include".to_string())) {
            Some(YamlValue::String(path)) => Some(path.as_str()),
            _ => None,
        },
        _ => None,
    }
}

/// Process $include directives recursively
fn process_includes(value: &mut YamlValue, base_dir: &Path, depth: usize) -> Result<()> {
    if let Some(include_path) = include_target(value) {
        let full_path = base_dir.join(include_path);
        *value = load_yaml_file_at_depth(&full_path, depth + 1)?;
        return Ok(());
    }

    match value {
        YamlValue::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                process_includes(v, base_dir, depth)?;
            }
        }
        YamlValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                process_includes(item, base_dir, depth)?;
            }
        }
        _ => {}
    }

    Ok(())
}

fn reject_includes(value: &YamlValue) -> Result<()> {
    if let Some(path) = include_target(value) {
        return Err(SwitchError::Config(format!(
            "Cannot resolve $include '{}' without a base directory",
            path
        )));
    }

    match value {
        YamlValue::Mapping(map) => map.iter().try_for_each(|(_, v)| reject_includes(v)),
        YamlValue::Sequence(seq) => seq.iter().try_for_each(reject_includes),
        _ => Ok(()),
    }
}

/// Expand environment variables in the format ${ENV_VAR:default}
fn expand_variables(value: &mut YamlValue) {
    match value {
        YamlValue::String(s) => {
            if let Some(expanded) = expand_env_in_string(s) {
                *s = expanded;
            }
        }
        YamlValue::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                expand_variables(v);
            }
        }
        YamlValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                expand_variables(item);
            }
        }
        _ => {}
    }
}

fn env_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").ok())
        .as_ref()
}

/// Expand environment variables in a string
///
/// Returns `None` when the string has no placeholder. Field references
/// such as `{{ $json.value }}` do not match and are left for the host.
fn expand_env_in_string(s: &str) -> Option<String> {
    if !s.contains("${") {
        return None;
    }

    let expanded = env_pattern()?.replace_all(s, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        env::var(&caps[1]).unwrap_or_else(|_| default_value.to_string())
    });

    Some(expanded.into_owned())
}

/// Convert YAML value to JSON value
fn yaml_to_json(yaml: &YamlValue) -> Result<JsonValue> {
    match yaml {
        YamlValue::Null => Ok(JsonValue::Null),
        YamlValue::Bool(b) => Ok(JsonValue::Bool(*b)),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(JsonValue::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(JsonValue::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .ok_or_else(|| SwitchError::Config(format!("Invalid number: {}", f)))
            } else {
                Err(SwitchError::Config("Invalid number".to_string()))
            }
        }
        YamlValue::String(s) => Ok(JsonValue::String(s.clone())),
        YamlValue::Sequence(seq) => {
            let json_seq: Result<Vec<JsonValue>> = seq.iter().map(yaml_to_json).collect();
            Ok(JsonValue::Array(json_seq?))
        }
        YamlValue::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    YamlValue::String(s) => s.clone(),
                    YamlValue::Number(n) => n.to_string(),
                    YamlValue::Bool(b) => b.to_string(),
                    _ => {
                        return Err(SwitchError::Config(
                            "Map keys must be strings".to_string(),
                        ))
                    }
                };
                json_map.insert(key, yaml_to_json(v)?);
            }
            Ok(JsonValue::Object(json_map))
        }
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}
