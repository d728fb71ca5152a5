//! Integration tests for YAML node definitions
//!
//! Loads definitions from disk, builds a host from them and routes batches,
//! including `$include` of shared rule lists and environment expansion.

use serde_json::json;
use std::fs;
use switch_engine::config::lint_rules;
use switch_engine::{route_batch, NodeDefinition, Record, StaticHost, SwitchSettings};
use tempfile::TempDir;

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

const TEMPERATURE_ROUTER: &str = r#"
name: Temperature router
parameters:
  numberOfOutputs: 3
  outputLabels: "Cold, Mild, Hot"
  dataType: number
  value1Number: "{{ $json.celsius }}"
  rulesNumber:
    rules:
      - operation: smaller
        value2: 10
        output: 0
      - operation: largerEqual
        value2: 25
        output: 2
  fallbackOutput: 1
"#;

#[test]
fn test_route_with_definition_file() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("temperature.yaml");
    fs::write(&path, TEMPERATURE_ROUTER)?;

    let definition = NodeDefinition::from_yaml_file(&path)?;
    let items = Record::batch(vec![
        json!({ "celsius": 4 }),
        json!({ "celsius": 18 }),
        json!({ "celsius": 31 }),
    ]);
    let host = StaticHost::from_definition(&definition, &SwitchSettings::default()).with_items(&items);

    let batch = route_batch(&items, &host)?;

    assert_eq!(batch.config.node_name(), "Temperature router");
    assert_eq!(batch.config.labels(), ["Cold", "Mild", "Hot"]);
    assert_eq!(batch.summary.per_channel, vec![1, 1, 1]);
    assert_eq!(batch.channels[2].records[0].paired_item.item, 2);

    Ok(())
}

#[test]
fn test_shared_rules_via_include() -> TestResult {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("priority-rules.yaml"),
        r#"
rules:
  - operation: regex
    pattern: "/^urgent/i"
    output: 1
  - operation: contains
    value2: "later"
    output: 2
"#,
    )?;
    fs::write(
        dir.path().join("triage.yaml"),
        r#"
name: Triage
continueOnFail: true
parameters:
  numberOfOutputs: 3
  dataType: string
  value1String: "={{ $json.subject }}"
  rulesString:
    $include: priority-rules.yaml
  fallbackOutput: 0
"#,
    )?;

    let definition = NodeDefinition::from_yaml_file(dir.path().join("triage.yaml"))?;
    let items = Record::batch(vec![
        json!({ "subject": "URGENT: disk full" }),
        json!({ "subject": "Read LATER" }),
        json!({ "subject": "hello" }),
    ]);
    let host = StaticHost::from_definition(&definition, &SwitchSettings::default()).with_items(&items);

    let batch = route_batch(&items, &host)?;

    assert!(batch.config.continue_on_fail());
    assert_eq!(batch.summary.per_channel, vec![1, 1, 1]);
    assert_eq!(*batch.channels[1].records[0].json, json!({ "subject": "URGENT: disk full" }));

    Ok(())
}

#[test]
fn test_environment_expansion() -> TestResult {
    std::env::set_var("DYNSWITCH_IT_OUTPUTS", "5");

    let definition = NodeDefinition::from_yaml_str(
        r#"
parameters:
  numberOfOutputs: "${DYNSWITCH_IT_OUTPUTS:2}"
  outputLabels: "${DYNSWITCH_IT_MISSING_LABELS:North, South}"
"#,
    )?;
    let host = StaticHost::from_definition(&definition, &SwitchSettings::default());
    let batch = route_batch(&[], &host)?;

    assert_eq!(batch.config.channel_count(), 5);
    assert_eq!(batch.config.labels()[1], "South");

    std::env::remove_var("DYNSWITCH_IT_OUTPUTS");
    Ok(())
}

#[test]
fn test_settings_fill_missing_identity() -> TestResult {
    let definition = NodeDefinition::from_yaml_str("parameters: {}")?;
    let settings = SwitchSettings {
        node_name: Some("Fallback name".to_string()),
        continue_on_fail: Some(true),
        ..SwitchSettings::default()
    };

    let host = StaticHost::from_definition(&definition, &settings);
    let batch = route_batch(&[], &host)?;

    assert_eq!(batch.config.node_name(), "Fallback name");
    assert!(batch.config.continue_on_fail());
    Ok(())
}

#[test]
fn test_lint_definition() -> TestResult {
    let definition = NodeDefinition::from_yaml_str(
        r#"
parameters:
  numberOfOutputs: 2
  rulesNumber:
    rules:
      - { operation: larger, value2: 1, output: 1 }
      - { operation: after, value2: 1, output: 1 }
      - { operation: equal, value2: 1, output: 4 }
"#,
    )?;
    let host = StaticHost::from_definition(&definition, &SwitchSettings::default());

    let (_, issues) = lint_rules(&host)?;
    let rendered: Vec<String> = issues.iter().map(ToString::to_string).collect();

    assert_eq!(
        rendered,
        vec![
            "rule 1: Unknown operation: after".to_string(),
            "rule 2: Output index 4 is out of range. Must be between 0 and 1.".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn test_invalid_definition_is_rejected() {
    let result = NodeDefinition::from_yaml_str("parameters: [1, 2, 3]");
    assert!(result.is_err());
}
