//! Integration tests for the denotify CLI surface: help, usage errors,
//! exit codes and JSON error envelopes.

mod support;

use predicates::prelude::*;
use support::{denotify, Fixture};

// ============================================================================
// Help and version
// ============================================================================

#[test]
fn test_help_flag() {
    denotify()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: denotify"))
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--preserve-structure"))
        .stdout(predicate::str::contains("--assets"));
}

#[test]
fn test_version_flag() {
    denotify()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("denotify"));
}

// ============================================================================
// Usage errors (exit 2)
// ============================================================================

#[test]
fn test_missing_output_is_usage_error() {
    denotify().arg("vault").assert().code(2);
}

#[test]
fn test_unknown_format_is_usage_error() {
    let fx = Fixture::new();
    fx.write("a.md", "hello");

    denotify()
        .arg(fx.vault())
        .arg(fx.out())
        .args(["--format", "docx"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("docx"));
}

#[test]
fn test_unknown_asset_policy_is_usage_error() {
    let fx = Fixture::new();

    denotify()
        .arg(fx.vault())
        .arg(fx.out())
        .args(["--assets", "move"])
        .assert()
        .code(2);
}

#[test]
fn test_usage_error_as_json_envelope() {
    let fx = Fixture::new();

    let output = denotify()
        .arg(fx.vault())
        .arg(fx.out())
        .args(["--format", "docx", "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let json: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert_eq!(json["error"]["type"], "usage_error");
    assert_eq!(json["error"]["code"], 2);
}

#[test]
fn test_missing_explicit_config_is_usage_error() {
    let fx = Fixture::new();
    fx.write("a.md", "hello");

    denotify()
        .arg(fx.vault())
        .arg(fx.out())
        .arg("--config")
        .arg(fx.dir.path().join("nope.toml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope.toml"));
}

// ============================================================================
// Data errors (exit 3)
// ============================================================================

#[test]
fn test_missing_input_is_data_error() {
    let fx = Fixture::new();

    denotify()
        .arg(fx.dir.path().join("no-such-vault"))
        .arg(fx.out())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("input not found"));

    assert!(!fx.out().exists());
}

#[test]
fn test_missing_input_json_error() {
    let fx = Fixture::new();

    let output = denotify()
        .arg(fx.dir.path().join("no-such-vault"))
        .arg(fx.out())
        .arg("--json")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let json: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert_eq!(json["error"]["type"], "input_not_found");
}

#[test]
fn test_quiet_suppresses_error_text() {
    let fx = Fixture::new();

    denotify()
        .arg(fx.dir.path().join("no-such-vault"))
        .arg(fx.out())
        .arg("--quiet")
        .assert()
        .code(3)
        .stderr(predicate::str::is_empty());
}

// ============================================================================
// Logging
// ============================================================================

#[test]
fn test_log_level_debug_shows_resolved_configuration() {
    let fx = Fixture::new();
    fx.write("a.md", "hello");

    denotify()
        .arg(fx.vault())
        .arg(fx.out())
        .args(["--log-level", "debug"])
        .assert()
        .success()
        .stderr(predicate::str::contains("resolved configuration"));
}

#[test]
fn test_default_log_level_is_quiet() {
    let fx = Fixture::new();
    fx.write("a.md", "hello");

    denotify()
        .arg(fx.vault())
        .arg(fx.out())
        .assert()
        .success()
        .stderr(predicate::str::contains("resolved configuration").not());
}
