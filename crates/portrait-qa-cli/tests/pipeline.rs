//! Pipeline integration tests using synthetic portraits.
//!
//! Runs the binary end to end against a loopback annotation provider and a
//! bucket directory inside a temp workspace.

#![allow(clippy::unwrap_used)]

mod common;

use common::{json_lines, portrait_with_one_face, StubProvider, Workspace};
use portrait_qa_test_support::{AnnotationBuilder, FaceBuilder, PortraitBuilder};
use predicates::prelude::*;

// === Rejections ===

#[test]
fn test_low_resolution_photo_is_rejected() {
    let ws = Workspace::new();
    let portrait = PortraitBuilder::new(300, 300);
    let provider = StubProvider::annotating(
        AnnotationBuilder::new().face(FaceBuilder::new(portrait.face_box()).age(25, 35, 0.8)),
    );
    let photo = ws.write("small.jpg", &portrait.jpeg());

    let output = ws
        .cli()
        .args(["--vision-endpoint", &provider.url])
        .arg(&photo)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let record = &json_lines(&output.stdout)[0];
    assert_eq!(record["isValid"], false);
    assert_eq!(record["validationSummary"]["errorKind"], "input_error");
    assert!(record.get("imageUrl").is_none());
    assert!(ws.stored("tmp").is_empty());
    assert!(ws.stored("validated").is_empty());
}

#[test]
fn test_group_photo_is_rejected() {
    let ws = Workspace::new();
    let portrait = PortraitBuilder::new(600, 600);
    let provider = StubProvider::annotating(
        AnnotationBuilder::new()
            .face(FaceBuilder::new(portrait.face_box()).age(30, 34, 0.8))
            .face(FaceBuilder::new(portrait.face_box()).age(40, 44, 0.8)),
    );
    let photo = ws.write("group.jpg", &portrait.jpeg());

    let output = ws
        .cli()
        .args(["--vision-endpoint", &provider.url])
        .arg(&photo)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let record = &json_lines(&output.stdout)[0];
    let reasons = record["validationSummary"]["reasons"].as_array().unwrap();
    assert!(reasons
        .iter()
        .any(|r| r.as_str().unwrap().starts_with("humanFeatureAnalysis:")));
}

#[test]
fn test_unreadable_bytes_fail_integrity() {
    let ws = Workspace::new();
    let (_, provider) = portrait_with_one_face();
    let photo = ws.write("broken.jpg", b"\xFF\xD8 definitely not a jpeg");

    let output = ws
        .cli()
        .args(["--vision-endpoint", &provider.url])
        .arg(&photo)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let record = &json_lines(&output.stdout)[0];
    assert_eq!(record["validationSummary"]["errorKind"], "integrity_error");
    assert!(ws.stored("").is_empty());
}

// === Storage ===

#[test]
fn test_temporary_upload_is_always_removed() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let photo = ws.write("photo.jpg", &jpeg);

    let output = ws
        .cli()
        .args(["--caller", "studio-7", "--vision-endpoint", &provider.url])
        .arg(&photo)
        .output()
        .unwrap();

    assert!(ws.stored("tmp").is_empty());
    let record = &json_lines(&output.stdout)[0];
    let id = record["validationId"].as_str().unwrap();
    if record["isValid"] == true {
        assert_eq!(output.status.code(), Some(0));
        let promoted = ws.bucket().join(format!("validated/studio-7/{id}.jpg"));
        assert!(promoted.exists(), "missing {}", promoted.display());
        assert!(record["imageUrl"].as_str().unwrap().starts_with("file://"));
    } else {
        assert_eq!(output.status.code(), Some(1));
        assert!(ws.stored("validated").is_empty());
    }
}

#[test]
fn test_no_enhance_skips_enhanced_copy() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    let photo = ws.write("photo.jpg", &jpeg);

    let output = ws
        .cli()
        .args(["--no-enhance", "--vision-endpoint", &provider.url])
        .arg(&photo)
        .output()
        .unwrap();

    let record = &json_lines(&output.stdout)[0];
    assert_eq!(record["enhancementApplied"], false);
    assert!(record.get("enhancedImageUrl").is_none());
    assert!(ws.stored("enhanced").is_empty());
}

// === Provider Failures ===

#[test]
fn test_lenient_mode_reports_unavailable_provider() {
    let ws = Workspace::new();
    let provider = StubProvider::start(503, r#"{"error":"down"}"#.into());
    let photo = ws.write("photo.jpg", &PortraitBuilder::new(600, 600).jpeg());

    let output = ws
        .cli()
        .args(["--vision-endpoint", &provider.url])
        .arg(&photo)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let record = &json_lines(&output.stdout)[0];
    assert_eq!(record["isValid"], false);
    assert_eq!(record["analysis"]["dataQuality"]["featureSource"], "unavailable");
    assert!(provider.hits() >= 1);
    assert!(ws.stored("tmp").is_empty());
}

#[test]
fn test_strict_mode_fails_on_unavailable_provider() {
    let ws = Workspace::new();
    let provider = StubProvider::start(503, r#"{"error":"down"}"#.into());
    let photo = ws.write("photo.jpg", &PortraitBuilder::new(600, 600).jpeg());

    ws.cli()
        .args(["--strict", "--vision-endpoint", &provider.url])
        .arg(&photo)
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Validation failed"));
    assert!(ws.stored("tmp").is_empty());
}

#[test]
fn test_fallback_provider_answers_when_primary_finds_no_face() {
    let ws = Workspace::new();
    let primary = StubProvider::annotating(AnnotationBuilder::new().label("Wall", 0.9));
    let fallback = StubProvider::start(
        200,
        r#"{"faces":[{"bbox":[0.3,0.2,0.4,0.55],"confidence":0.93,"age":31.0}]}"#
            .into(),
    );
    let photo = ws.write("photo.jpg", &PortraitBuilder::new(600, 600).jpeg());

    let output = ws
        .cli()
        .args(["--vision-endpoint", &primary.url])
        .args(["--deep-endpoint", &fallback.url])
        .arg(&photo)
        .output()
        .unwrap();

    let record = &json_lines(&output.stdout)[0];
    assert_eq!(record["analysis"]["dataQuality"]["featureSource"], "fallback");
    assert_eq!(primary.hits(), 1);
    assert_eq!(fallback.hits(), 1);
}

// === Batches ===

#[test]
fn test_directory_batch_mixes_outcomes() {
    let ws = Workspace::new();
    let (jpeg, provider) = portrait_with_one_face();
    ws.write("batch/good.jpg", &jpeg);
    ws.write("batch/nested/small.jpg", &PortraitBuilder::new(300, 300).jpeg());

    let flat = ws
        .cli()
        .args(["--vision-endpoint", &provider.url])
        .arg(ws.path().join("batch"))
        .output()
        .unwrap();
    assert_eq!(json_lines(&flat.stdout).len(), 1);

    let recursive = ws
        .cli()
        .args(["--recursive", "--vision-endpoint", &provider.url])
        .arg(ws.path().join("batch"))
        .output()
        .unwrap();
    let records = json_lines(&recursive.stdout);
    assert_eq!(records.len(), 2);
    assert_eq!(recursive.status.code(), Some(1));
    let ids: Vec<&str> = records
        .iter()
        .map(|r| r["validationId"].as_str().unwrap())
        .collect();
    assert_ne!(ids[0], ids[1]);
}
