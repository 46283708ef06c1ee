//! Integration tests for configuration layering.
//!
//! Tests the full priority chain: hardcoded defaults < XDG config < project config < CLI args

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity

mod common;

use common::{portrait_with_one_face, Workspace};
use predicates::prelude::*;

#[test]
fn test_project_config_applies_format_and_provider() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let photo = ws.write("photo.jpg", &jpeg);
    ws.write(
        ".portrait-qa.toml",
        format!(
            "[output]\nformat = 'json'\n\n[provider]\nvision_endpoint = '{}'\n",
            provider.url
        )
        .as_bytes(),
    );

    ws.cli()
        .arg(&photo)
        .assert()
        .code(predicate::in_iter([0, 1]))
        .stdout(predicate::str::starts_with("["));
    assert_eq!(provider.hits(), 1);
}

#[test]
fn test_cli_overrides_project_config() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let photo = ws.write("photo.jpg", &jpeg);
    ws.write(
        ".portrait-qa.toml",
        format!(
            "[output]\nformat = 'json'\n\n[provider]\nvision_endpoint = '{}'\n",
            provider.url
        )
        .as_bytes(),
    );

    ws.cli()
        .args(["--format", "jsonl"])
        .arg(&photo)
        .assert()
        .code(predicate::in_iter([0, 1]))
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn test_xdg_config_is_overridden_by_project_config() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let photo = ws.write("photo.jpg", &jpeg);
    ws.write(
        "xdg/portrait-qa/config.toml",
        format!(
            "[output]\nformat = 'json'\n\n[provider]\nvision_endpoint = '{}'\n",
            provider.url
        )
        .as_bytes(),
    );
    ws.write(".portrait-qa.toml", b"[output]\nformat = 'jsonl'\n");

    ws.cli()
        .arg(&photo)
        .assert()
        .code(predicate::in_iter([0, 1]))
        .stdout(predicate::str::starts_with("{"));
    // Endpoint only set in the XDG file.
    assert_eq!(provider.hits(), 1);
}

#[test]
fn test_config_age_window_rejects_photo() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let photo = ws.write("photo.jpg", &jpeg);
    ws.write(
        ".portrait-qa.toml",
        format!(
            "[options]\nmax_age = 12\n\n[provider]\nvision_endpoint = '{}'\n",
            provider.url
        )
        .as_bytes(),
    );

    let output = ws.cli().arg(&photo).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let records = common::json_lines(&output.stdout);
    let reasons = records[0]["validationSummary"]["reasons"].as_array().unwrap();
    assert!(reasons
        .iter()
        .any(|r| r.as_str().unwrap().contains("outside the allowed range 0-12")));
}

#[test]
fn test_cli_age_flag_overrides_config() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let photo = ws.write("photo.jpg", &jpeg);
    ws.write(
        ".portrait-qa.toml",
        format!(
            "[options]\nmax_age = 12\n\n[provider]\nvision_endpoint = '{}'\n",
            provider.url
        )
        .as_bytes(),
    );

    let output = ws.cli().args(["--max-age", "90"]).arg(&photo).output().unwrap();
    let records = common::json_lines(&output.stdout);
    let reasons = records[0]["validationSummary"]["reasons"].as_array().unwrap();
    assert!(reasons
        .iter()
        .all(|r| !r.as_str().unwrap().contains("outside the allowed range")));
}

#[test]
fn test_invalid_config_warns_and_continues() {
    let ws = Workspace::new();
    ws.write(".portrait-qa.toml", b"[options]\nmin_age = 50\nmax_age = 10\n");

    ws.cli()
        .args(["--vision-endpoint", "http://127.0.0.1:9/annotate"])
        .arg(ws.path().join("missing.jpg"))
        .assert()
        .stderr(predicate::str::contains("warning:"));
}
