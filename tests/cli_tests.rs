#![allow(deprecated)]
//! Integration tests for the hktgen CLI

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn hktgen_cmd() -> Command {
    Command::cargo_bin("hktgen").expect("binary not found")
}

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixture")
}

fn fixture(name: &str) -> PathBuf {
    fixture_dir().join(name)
}

// =============================================================================
// check
// =============================================================================

#[test]
fn test_check_valid_manifest() {
    hktgen_cmd()
        .arg("check")
        .arg(fixture("valid.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Summary: 2 valid, 0 failed, 1 not applicable",
        ));
}

#[test]
fn test_check_invalid_manifest_reports_every_error() {
    hktgen_cmd()
        .arg("check")
        .arg(fixture("invalid.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[HKT003]"))
        .stderr(predicate::str::contains("error[HKT004]"))
        .stderr(predicate::str::contains("error[HKT005]"))
        .stderr(predicate::str::contains("1 declaration(s) failed validation"));
}

#[test]
fn test_check_json_output() {
    let output = hktgen_cmd()
        .env_remove("RUST_LOG")
        .args(["check", "--json"])
        .arg(fixture("invalid.json"))
        .output()
        .unwrap();
    assert!(!output.status.success());

    // Diagnostics are logged to stderr so stdout stays a single JSON document.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("HKT005"), "{stderr}");

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["command"], "check");
    assert_eq!(json["success"], false);
    assert_eq!(json["valid"][0], "com.example.Good");

    let failure = &json["failures"][0];
    assert_eq!(failure["declaration"], "com.example.Pair");
    let codes: Vec<&str> = failure["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes[0], "HKT003");
    assert_eq!(codes.last(), Some(&"HKT005"));
}

#[test]
fn test_missing_manifest() {
    hktgen_cmd()
        .args(["check", "/nonexistent/candidates.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read manifest"));
}

#[test]
fn test_malformed_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.json");
    fs::write(&path, "{ \"declarations\": [ { \"name\": 3 } ] }").unwrap();

    hktgen_cmd()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse manifest"));
}

#[test]
fn test_unknown_default_visibility_rejected() {
    hktgen_cmd()
        .args(["check", "--default-visibility", "Protected"])
        .arg(fixture("valid.json"))
        .assert()
        .failure();
}

// =============================================================================
// generate
// =============================================================================

#[test]
fn test_generate_writes_accessor_class() {
    let temp_dir = TempDir::new().unwrap();

    hktgen_cmd()
        .arg("generate")
        .arg(fixture("valid.json"))
        .arg("--out-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote com/example/Hkt.java"));

    let text = fs::read_to_string(temp_dir.path().join("com/example/Hkt.java")).unwrap();
    assert!(text.starts_with("package com.example;\n"));
    assert!(text.contains("import org.derive4j.hkt.TypeEq;\nimport org.derive4j.hkt.__;\n"));
    assert!(text.contains("public final class Hkt {"));
    assert!(text.contains(
        "public static <A> Box<A> asBox(final __<Box.µ, A> hkt) { return (Box<A>) hkt; }"
    ));
    assert!(text.contains("    static <A, B> Pair<A, B> asPair(final __<__<Pair, A>, B> hkt)"));
    assert!(!text.contains("Plain"));
}

#[test]
fn test_generate_twice_is_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let run = || {
        hktgen_cmd()
            .arg("generate")
            .arg(fixture("valid.json"))
            .arg("--out-dir")
            .arg(temp_dir.path())
            .assert()
            .success()
    };

    run();
    let first = fs::read_to_string(temp_dir.path().join("com/example/Hkt.java")).unwrap();
    run().stdout(predicate::str::contains("unchanged com/example/Hkt.java"));
    let second = fs::read_to_string(temp_dir.path().join("com/example/Hkt.java")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_generate_partial_success() {
    let temp_dir = TempDir::new().unwrap();

    hktgen_cmd()
        .arg("generate")
        .arg(fixture("invalid.json"))
        .arg("--out-dir")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[HKT005]"));

    let text = fs::read_to_string(temp_dir.path().join("com/example/Hkt.java")).unwrap();
    assert!(text.contains("asGood("));
    assert!(!text.contains("asPair("));
}

#[test]
fn test_generate_with_scoped_config() {
    let temp_dir = TempDir::new().unwrap();

    hktgen_cmd()
        .arg("generate")
        .arg(fixture("scoped.json"))
        .arg("--out-dir")
        .arg(temp_dir.path())
        .assert()
        .success();

    let text =
        fs::read_to_string(temp_dir.path().join("com/example/Encodings.java")).unwrap();
    assert!(text.contains("public final class Encodings {"));
    assert!(text.contains("private Encodings() {}"));
    assert!(text.contains("public static <A> Box<A> fromBox("));
    assert!(!text.contains("TypeEq"));
}

#[test]
fn test_default_visibility_flag() {
    let temp_dir = TempDir::new().unwrap();

    hktgen_cmd()
        .args(["generate", "--default-visibility", "disabled"])
        .arg(fixture("invalid.json"))
        .arg("--out-dir")
        .arg(temp_dir.path())
        .assert()
        .failure();

    // Good is valid but disabled, so no file is created.
    assert!(!temp_dir.path().join("com/example/Hkt.java").exists());
}

// =============================================================================
// config
// =============================================================================

#[test]
fn test_config_human_output() {
    hktgen_cmd()
        .arg("config")
        .arg(fixture("scoped.json"))
        .arg("com.example.Box")
        .assert()
        .success()
        .stdout(predicate::str::contains("generated in:   Encodings"))
        .stdout(predicate::str::contains("visibility:     Same"))
        .stdout(predicate::str::contains("coerce method:  fromBox"))
        .stdout(predicate::str::contains("TypeEq method:  (none)"));
}

#[test]
fn test_config_json_output() {
    let output = hktgen_cmd()
        .args(["config", "--json"])
        .arg(fixture("scoped.json"))
        .arg("com.example.Box")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["output_class_name"], "Encodings");
    assert_eq!(json["visibility"], "Same");
    assert_eq!(json["coerce_method_template"], "from{ClassName}");
    assert_eq!(json["type_eq_method_template"], "");
}

#[test]
fn test_config_unknown_declaration() {
    hktgen_cmd()
        .arg("config")
        .arg(fixture("scoped.json"))
        .arg("com.example.Missing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No declaration named com.example.Missing"));
}
