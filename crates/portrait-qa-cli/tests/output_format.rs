//! Output format validation tests.
//!
//! Tests JSON/JSONL output format correctness and required field presence.

#![allow(clippy::unwrap_used)]

mod common;

use common::{json_lines, portrait_with_one_face, Workspace};
use serde_json::Value;

// === JSONL Format Tests ===

#[test]
fn test_jsonl_format_single_object_per_line() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let first = ws.write("a.jpg", &jpeg);
    let second = ws.write("b.jpg", &jpeg);

    let output = ws
        .cli()
        .args(["--format", "jsonl", "--vision-endpoint", &provider.url])
        .arg(&first)
        .arg(&second)
        .output()
        .unwrap();

    let records = json_lines(&output.stdout);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(Value::is_object));
    assert_eq!(provider.hits(), 2);
}

#[test]
fn test_jsonl_record_has_required_fields() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let photo = ws.write("photo.jpg", &jpeg);

    let output = ws
        .cli()
        .args(["--vision-endpoint", &provider.url])
        .arg(&photo)
        .output()
        .unwrap();

    let record = &json_lines(&output.stdout)[0];
    assert!(record["path"].as_str().unwrap().ends_with("photo.jpg"));
    let id = record["validationId"].as_str().unwrap();
    assert!(id.starts_with("VAL_"), "unexpected id {id}");
    assert_eq!(id, id.to_uppercase());
    assert!(record["isValid"].is_boolean());
    assert!(record["confidenceScore"].is_number());
    assert!(record["validationSummary"]["userFriendlyMessage"].is_string());
    assert!(record["validationSummary"]["reasons"].is_array());
    assert!(record["recommendations"].is_array());
    assert_eq!(record["standardSpecs"]["width"], 1024);
    assert_eq!(record["analysis"]["dataQuality"]["featureSource"], "primary");
    assert!(record["validationSummary"].get("steps").is_none());
}

// === JSON Array Format Tests ===

#[test]
fn test_json_format_is_an_array() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let photo = ws.write("photo.jpg", &jpeg);

    let output = ws
        .cli()
        .args(["--format", "json", "--vision-endpoint", &provider.url])
        .arg(&photo)
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1, "compact array is one line");
    let value: Value = serde_json::from_str(&stdout).unwrap();
    let array = value.as_array().unwrap();
    assert_eq!(array.len(), 1);
    assert!(array[0]["validationId"].as_str().unwrap().starts_with("VAL_"));
}

#[test]
fn test_json_pretty_spans_lines() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let photo = ws.write("photo.jpg", &jpeg);

    let output = ws
        .cli()
        .args(["--format", "json", "--pretty", "--vision-endpoint", &provider.url])
        .arg(&photo)
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().count() > 1);
    let value: Value = serde_json::from_str(&stdout).unwrap();
    assert!(value.is_array());
}

#[test]
fn test_json_format_with_no_images_is_empty_array() {
    let ws = Workspace::new();
    let empty = ws.path().join("empty");
    std::fs::create_dir(&empty).unwrap();

    let output = ws
        .cli()
        .args(["--format", "json", "--vision-endpoint", "http://127.0.0.1:9/x"])
        .arg(&empty)
        .output()
        .unwrap();

    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "[]");
}
