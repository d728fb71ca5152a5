//! Integration tests for batch routing
//!
//! Covers:
//! - channel allocation and clamping
//! - expression mode placement and fallback
//! - rules mode with first and all match strategies
//! - string, regex and date-time comparisons
//! - failure isolation with and without continue-on-failure

use serde_json::{json, Value};
use switch_engine::{
    route_batch, Channel, NodeExecutor, Record, StaticHost, SwitchError, SwitchNode,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Route payloads through a host built from `params`
fn run(params: Value, payloads: Vec<Value>) -> switch_engine::Result<Vec<Channel>> {
    run_with(params, payloads, false)
}

fn run_with(
    params: Value,
    payloads: Vec<Value>,
    continue_on_fail: bool,
) -> switch_engine::Result<Vec<Channel>> {
    let items = Record::batch(payloads);
    let host = StaticHost::new(params)
        .with_items(&items)
        .with_continue_on_fail(continue_on_fail);
    route_batch(&items, &host).map(|batch| batch.channels)
}

/// Payloads of every channel, in channel order
fn payloads(channels: &[Channel]) -> Vec<Vec<Value>> {
    channels
        .iter()
        .map(|c| c.records.iter().map(|r| (*r.json).clone()).collect())
        .collect()
}

fn single_rule(data_type: &str, left: Value, rule: Value) -> Value {
    let (left_key, rules_key) = match data_type {
        "boolean" => ("value1Boolean", "rulesBoolean"),
        "dateTime" => ("value1DateTime", "rulesDateTime"),
        "string" => ("value1String", "rulesString"),
        _ => ("value1Number", "rulesNumber"),
    };
    let mut params = json!({ "dataType": data_type });
    params[left_key] = left;
    params[rules_key] = json!({ "rules": [rule] });
    params
}

/// Whether a single rule sends the record to channel 1
fn matches(params: Value) -> bool {
    let channels = run(params, vec![json!({})]).unwrap();
    channels[1].records.len() == 1
}

// ============================================================================
// Channel allocation
// ============================================================================

#[test]
fn test_channel_count_is_clamped() {
    for (requested, expected) in [(json!(0), 1), (json!(3.5), 3), (json!(80), 50), (json!(null), 2)] {
        let channels = run(json!({ "numberOfOutputs": requested }), vec![]).unwrap();
        assert_eq!(channels.len(), expected);
    }
}

#[test]
fn test_channel_count_is_fixed_per_batch() {
    // Every item asks for a different count; only the first request is used
    let channels = run(
        json!({ "numberOfOutputs": "{{ $json.n }}", "mode": "expression", "expressionOutput": 0 }),
        vec![json!({ "n": 3 }), json!({ "n": 7 }), json!({ "n": 1 })],
    )
    .unwrap();

    assert_eq!(channels.len(), 3);
    assert_eq!(channels[0].records.len(), 3);
}

#[test]
fn test_labels_are_attached() {
    let channels = run(
        json!({ "numberOfOutputs": 3, "outputLabels": "Cold, , Hot" }),
        vec![],
    )
    .unwrap();

    let labels: Vec<&str> = channels.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Cold", "Hot", "Route 2"]);
}

// ============================================================================
// Expression mode
// ============================================================================

#[test]
fn test_expression_routes_to_target() {
    let channels = run(
        json!({
            "mode": "expression",
            "numberOfOutputs": 4,
            "expressionOutput": "{{ $json.route }}",
        }),
        vec![json!({ "route": 3 }), json!({ "route": 0 }), json!({ "route": 1.9 })],
    )
    .unwrap();

    assert_eq!(
        payloads(&channels),
        vec![
            vec![json!({ "route": 0 })],
            vec![json!({ "route": 1.9 })],
            vec![],
            vec![json!({ "route": 3 })],
        ]
    );
}

#[test]
fn test_expression_out_of_range_is_dropped() {
    let channels = run(
        json!({ "mode": "expression", "expressionOutput": 7, "fallbackOutput": -1 }),
        vec![json!({ "id": 1 })],
    )
    .unwrap();

    assert!(channels.iter().all(|c| c.records.is_empty()));
}

#[test]
fn test_expression_out_of_range_uses_fallback() {
    let channels = run(
        json!({ "mode": "expression", "numberOfOutputs": 3, "expressionOutput": -4, "fallbackOutput": 2 }),
        vec![json!({ "id": 1 })],
    )
    .unwrap();

    assert_eq!(channels[2].records.len(), 1);
    assert_eq!(channels[0].records.len() + channels[1].records.len(), 0);
}

// ============================================================================
// Rules mode
// ============================================================================

#[test]
fn test_end_to_end_number_rules() {
    let channels = run(
        json!({
            "mode": "rules",
            "dataType": "number",
            "value1Number": "{{ $json.v }}",
            "rulesNumber": { "rules": [{ "operation": "larger", "value2": 3, "output": 1 }] },
            "matchStrategy": "first",
            "fallbackOutput": 0,
        }),
        vec![json!({ "v": 1 }), json!({ "v": 5 }), json!({ "v": 9 })],
    )
    .unwrap();

    assert_eq!(
        payloads(&channels),
        vec![
            vec![json!({ "v": 1 })],
            vec![json!({ "v": 5 }), json!({ "v": 9 })],
        ]
    );
    assert_eq!(channels[1].records[0].paired_item.item, 1);
    assert_eq!(channels[1].records[1].paired_item.item, 2);
}

#[test]
fn test_first_strategy_takes_earliest_rule() {
    let channels = run(
        json!({
            "numberOfOutputs": 3,
            "value1Number": 10,
            "rulesNumber": { "rules": [
                { "operation": "larger", "value2": 5, "output": 2 },
                { "operation": "larger", "value2": 1, "output": 1 },
            ]},
        }),
        vec![json!({ "id": 1 })],
    )
    .unwrap();

    assert_eq!(channels[2].records.len(), 1);
    assert!(channels[1].records.is_empty());
}

#[test]
fn test_all_strategy_appends_every_match() {
    let channels = run(
        json!({
            "numberOfOutputs": 3,
            "matchStrategy": "all",
            "value1Number": 10,
            "rulesNumber": { "rules": [
                { "operation": "larger", "value2": 5, "output": 2 },
                { "operation": "smaller", "value2": 5, "output": 0 },
                { "operation": "larger", "value2": 1, "output": 1 },
                { "operation": "equal", "value2": 10, "output": 1 },
            ]},
        }),
        vec![json!({ "id": 1 })],
    )
    .unwrap();

    assert_eq!(channels[0].records.len(), 0);
    assert_eq!(channels[1].records.len(), 2);
    assert_eq!(channels[2].records.len(), 1);
    assert!(channels[1].records[0].shares_payload(&channels[1].records[1]));
}

#[test]
fn test_no_match_without_fallback_drops() {
    let channels = run(
        json!({
            "value1Number": "{{ $json.v }}",
            "rulesNumber": { "rules": [{ "operation": "larger", "value2": 100, "output": 1 }] },
        }),
        vec![json!({ "v": 1 }), json!({ "v": 500 })],
    )
    .unwrap();

    let total: usize = channels.iter().map(|c| c.records.len()).sum();
    assert_eq!(total, 1);
    assert_eq!(*channels[1].records[0].json, json!({ "v": 500 }));
}

#[test]
fn test_per_record_fallback() {
    let channels = run(
        json!({
            "numberOfOutputs": 3,
            "fallbackOutput": "{{ $json.fb }}",
        }),
        vec![json!({ "fb": 2 }), json!({ "fb": -1 }), json!({ "fb": 0 })],
    )
    .unwrap();

    assert_eq!(channels[0].records[0].paired_item.item, 2);
    assert_eq!(channels[2].records[0].paired_item.item, 0);
    assert_eq!(channels.iter().map(|c| c.records.len()).sum::<usize>(), 2);
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn test_case_insensitive_string_equality() {
    let rule = json!({ "operation": "equal", "value2": "hello", "output": 1 });

    assert!(matches(single_rule("string", json!("Hello"), rule.clone())));

    let mut sensitive = single_rule("string", json!("Hello"), rule);
    sensitive["caseInsensitive"] = json!(false);
    assert!(!matches(sensitive));
}

#[test]
fn test_regex_rules() {
    let rule = |op: &str, pattern: &str| json!({ "operation": op, "pattern": pattern, "output": 1 });

    assert!(matches(single_rule("string", json!("Apple to Zebra"), rule("regex", "/^a.*z$/i"))));
    assert!(!matches(single_rule("string", json!("Apple to Zebra"), rule("regex", "/^a.*z$/"))));
    assert!(!matches(single_rule("string", json!("["), rule("regexMatch", "["))));
    assert!(matches(single_rule("string", json!("["), rule("regexNotMatch", "["))));
}

#[test]
fn test_regex_lookaround_and_backreferences() {
    let rule = |op: &str, pattern: &str| json!({ "operation": op, "pattern": pattern, "output": 1 });

    assert!(!matches(single_rule("string", json!("bar"), rule("notRegex", "^(?!foo)"))));
    assert!(matches(single_rule("string", json!("foobar"), rule("notRegex", "^(?!foo)"))));
    assert!(matches(single_rule("string", json!("abab"), rule("regex", r"/(ab)\1/"))));
    assert!(matches(single_rule("string", json!("price: 40 EUR"), rule("regex", r"/\d+(?= eur)/i"))));
}

#[test]
fn test_offset_date_time_forms() {
    let rule = |right: &str| json!({ "operation": "after", "value2": right, "output": 1 });

    assert!(matches(single_rule("dateTime", json!("2024-01-01T10:01Z"), rule("2024-01-01T10:00Z"))));
    assert!(matches(single_rule("dateTime", json!("2024-01-01T09:00Z"), rule("2024-01-01T10:00+02:00"))));
    assert!(!matches(single_rule("dateTime", json!("2024"), rule("2024-01-01T00:00:00.000+0000"))));
    assert!(matches(single_rule("dateTime", json!("2024-06"), rule("2024"))));
}

#[test]
fn test_string_operators() {
    let cases = [
        ("contains", "Hello World", "o w", true),
        ("notContains", "Hello World", "xyz", true),
        ("startsWith", "Hello World", "HELLO", true),
        ("notStartsWith", "Hello World", "world", true),
        ("endsWith", "Hello World", "WORLD", true),
        ("notEndsWith", "Hello World", "World", false),
        ("notEqual", "abc", "ABC", false),
    ];

    for (op, left, right, expected) in cases {
        let params = single_rule(
            "string",
            json!(left),
            json!({ "operation": op, "value2": right, "output": 1 }),
        );
        assert_eq!(matches(params), expected, "{} {:?} {:?}", op, left, right);
    }
}

#[test]
fn test_number_coercion() {
    let rule = |op: &str, right: Value| json!({ "operation": op, "value2": right, "output": 1 });

    assert!(matches(single_rule("number", json!("12"), rule("larger", json!(3)))));
    assert!(matches(single_rule("number", json!("abc"), rule("smallerEqual", json!(0)))));
    assert!(!matches(single_rule("number", json!("3"), rule("equal", json!(3)))));
    assert!(matches(single_rule("number", json!(3), rule("equal", json!(3)))));
}

#[test]
fn test_boolean_rules() {
    let rule = json!({ "operation": "equal", "value2": true, "output": 1 });
    assert!(matches(single_rule("boolean", json!(true), rule.clone())));
    assert!(!matches(single_rule("boolean", json!(false), rule)));
}

#[test]
fn test_date_time_rules() {
    let rule = |op: &str, right: &str| json!({ "operation": op, "value2": right, "output": 1 });

    assert!(matches(single_rule("dateTime", json!("2024-01-01"), rule("after", "2023-01-01"))));
    assert!(!matches(single_rule("dateTime", json!("2024-01-01"), rule("before", "2023-01-01"))));
    assert!(matches(single_rule(
        "dateTime",
        json!("2024-03-01T10:00:00+02:00"),
        rule("before", "2024-03-01T09:00:00Z")
    )));
    assert!(matches(single_rule("dateTime", json!(1_704_067_200_000_i64), rule("after", "2023-12-31"))));
}

// ============================================================================
// Failure handling
// ============================================================================

fn out_of_range_rules() -> Value {
    json!({
        "numberOfOutputs": 3,
        "value1Number": "{{ $json.v }}",
        "rulesNumber": { "rules": [
            { "operation": "larger", "value2": 3, "output": 10 },
            { "operation": "smallerEqual", "value2": 3, "output": 1 },
        ]},
    })
}

#[test]
fn test_out_of_range_target_aborts_batch() {
    let err = run(out_of_range_rules(), vec![json!({ "v": 1 }), json!({ "v": 5 })]).unwrap_err();

    assert!(matches!(err, SwitchError::ItemFailed { item_index: 1, .. }));
    assert_eq!(
        err.root().to_string(),
        "Output index 10 is out of range. Must be between 0 and 2."
    );
}

#[test]
fn test_out_of_range_target_with_continue_on_fail() {
    let channels = run_with(
        out_of_range_rules(),
        vec![json!({ "v": 5 }), json!({ "v": 1 }), json!({ "v": 2 })],
        true,
    )
    .unwrap();

    assert_eq!(
        payloads(&channels)[0],
        vec![json!({ "error": "Output index 10 is out of range. Must be between 0 and 2." })]
    );
    assert_eq!(channels[0].records[0].paired_item.item, 0);
    assert_eq!(channels[1].records.len(), 2);
}

#[test]
fn test_unknown_operator_is_reported() {
    let params = single_rule(
        "number",
        json!(1),
        json!({ "operation": "contains", "value2": 1, "output": 1 }),
    );

    let err = run(params, vec![json!({})]).unwrap_err();
    assert_eq!(err.root().to_string(), "Unknown operation: contains");
}

#[test]
fn test_invalid_date_with_continue_on_fail() {
    let params = json!({
        "dataType": "dateTime",
        "value1DateTime": "{{ $json.when }}",
        "rulesDateTime": { "rules": [{ "operation": "after", "value2": "2020-01-01", "output": 1 }] },
    });

    let channels = run_with(
        params,
        vec![json!({ "when": "someday" }), json!({ "when": "2021-06-01" })],
        true,
    )
    .unwrap();

    assert_eq!(
        payloads(&channels)[0],
        vec![json!({ "error": "Invalid DateTime value: \"someday\"" })]
    );
    assert_eq!(channels[1].records[0].paired_item.item, 1);
}

// ============================================================================
// Async surface
// ============================================================================

#[tokio::test]
async fn test_switch_node_execute() {
    let items = Record::batch(vec![json!({ "v": 1 }), json!({ "v": 5 })]);
    let host = StaticHost::new(json!({
        "value1Number": "{{ $json.v }}",
        "rulesNumber": { "rules": [{ "operation": "larger", "value2": 3, "output": 1 }] },
        "fallbackOutput": 0,
    }))
    .with_items(&items);

    let node = SwitchNode::new();
    let channels = node.execute(items, &host).await.unwrap();

    assert_eq!(payloads(&channels), vec![vec![json!({ "v": 1 })], vec![json!({ "v": 5 })]]);
}

#[tokio::test]
async fn test_executor_as_trait_object() {
    let executor: Box<dyn NodeExecutor> = Box::new(SwitchNode::default());
    let host = StaticHost::new(json!({ "numberOfOutputs": 5 }));

    let channels = executor.execute(Vec::new(), &host).await.unwrap();
    assert_eq!(channels.len(), 5);
}
