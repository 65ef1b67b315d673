use std::io::Write;
use std::process::Command;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn run_json(args: &[&str]) -> (bool, Value) {
    let output = Command::new(assert_cmd::cargo::cargo_bin!("formula-expr-cli"))
        .args(args)
        .output()
        .expect("run formula-expr-cli");
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let json = serde_json::from_str(stdout.trim()).expect("stdout is one JSON document");
    (output.status.success(), json)
}

#[test]
fn eval_prints_result_envelope() {
    let (ok, json) = run_json(&[
        "eval",
        "--expr",
        "amount > 1000 && stage == 'Closed Won'",
        "--record",
        r#"{"amount": 5000, "stage": "Closed Won"}"#,
    ]);
    assert!(ok);
    assert_eq!(
        json,
        json!({
            "success": true,
            "result": true,
            "expression": "amount > 1000 && stage == 'Closed Won'"
        })
    );
}

#[test]
fn eval_failure_exits_non_zero() {
    let (ok, json) = run_json(&["eval", "--expr", "1 / 0"]);
    assert!(!ok);
    assert_eq!(json["success"], false);
    assert_eq!(
        json["error"],
        "evaluation error: division by zero: cannot divide by zero"
    );
}

#[test]
fn condition_fails_closed_with_reason() {
    let (ok, json) = run_json(&["condition", "--expr", "amount >> 5", "--record", "{}"]);
    assert!(ok);
    assert_eq!(json["success"], true);
    assert_eq!(json["result"], false);
    assert!(json["error"].as_str().unwrap().starts_with("parse error"));

    let (_, json) = run_json(&[
        "condition",
        "--envelope",
        "--expr",
        "prior__stage != stage",
        "--record",
        r#"{"record": {"stage": "Won"}, "prior": {"stage": "Open"}}"#,
    ]);
    assert_eq!(json, json!({"success": true, "result": true}));
}

#[test]
fn validate_and_functions() {
    let (_, json) = run_json(&["validate", "--expr", "LEN(name) > 3"]);
    assert_eq!(json, json!({"success": true, "valid": true}));

    let (_, json) = run_json(&["validate", "--expr", "LEN(name,) > 3"]);
    assert_eq!(json["valid"], false);
    assert!(json["error"].is_string());

    let (_, json) = run_json(&["functions"]);
    let count = json["count"].as_u64().unwrap();
    assert_eq!(json["functions"].as_array().unwrap().len() as u64, count);
    assert_eq!(json["functions"][0]["name"], "CONTAINS");
    assert_eq!(json["functions"][0]["minArgs"], 2);
}

#[test]
fn sql_envelope() {
    let (ok, json) = run_json(&["sql", "--expr", "contains(name, 'Acme') && owner_id == null"]);
    assert!(ok);
    assert_eq!(
        json,
        json!({
            "success": true,
            "clause": "((name LIKE ?) AND (owner_id IS NULL))",
            "args": ["%Acme%"]
        })
    );
}

#[test]
fn config_and_record_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("engine.json");
    std::fs::write(&config_path, r#"{"maxExpressionLen": 5}"#).expect("write config");
    let record_path = dir.path().join("record.json");
    let mut record = std::fs::File::create(&record_path).expect("create record");
    record.write_all(br#"{"a": 2}"#).expect("write record");

    let config = config_path.to_str().unwrap();
    let record = record_path.to_str().unwrap();

    let (ok, json) = run_json(&[
        "--config",
        config,
        "eval",
        "--expr",
        "a * 3",
        "--record-file",
        record,
    ]);
    assert!(ok);
    assert_eq!(json["result"], 6.0);

    let (ok, json) = run_json(&["--config", config, "eval", "--expr", "a * 300"]);
    assert!(!ok);
    assert!(json["error"].as_str().unwrap().contains("limit is 5"));

    std::fs::write(&config_path, r#"{"maxDepth": 5}"#).expect("write config");
    let (ok, json) = run_json(&["--config", config, "functions"]);
    assert!(!ok);
    assert_eq!(json["success"], false);
}

#[test]
fn malformed_record_is_reported() {
    let (ok, json) = run_json(&["eval", "--expr", "a", "--record", "[1, 2]"]);
    assert!(!ok);
    assert_eq!(
        json["error"],
        "context must be a JSON object, got an array"
    );
}
