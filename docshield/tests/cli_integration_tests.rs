// docshield/tests/cli_integration_tests.rs
//! Command-line integration tests for the `docshield` binary.
//!
//! Each test builds an isolated JSON store in a temporary directory, runs the
//! binary against it with `assert_cmd`, and inspects stdout, stderr and the
//! files the run leaves behind. Output is not a terminal here, so no ANSI
//! colors are emitted.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use docshield_core::{Document, JsonFileStore, Rule, Severity, StoreSnapshot, Template};

const SOURCE: &str = "Patient SSN 123-45-6789, call 555-0100.\n";

fn ssn_rule() -> Rule {
    Rule {
        id: "ssn".to_string(),
        name: "US SSN".to_string(),
        pattern: r"\b\d{3}-\d{2}-\d{4}\b".to_string(),
        severity: Severity::High,
        entity_type: Some("ssn".to_string()),
        ..Default::default()
    }
}

/// Writes a store with one inline template (rule metadata missing) and one document.
fn seeded_store() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    fs::create_dir_all(dir.path().join("docs"))?;
    fs::write(dir.path().join("docs/d1.txt"), SOURCE)?;

    let mut snapshot = StoreSnapshot::default();
    snapshot
        .templates
        .insert("t1".to_string(), Template::inline("t1", "u1", "Clinical", vec![ssn_rule()]));
    snapshot
        .documents
        .insert("d1".to_string(), Document::new("d1", "u1", "docs/d1.txt"));

    let store_path = dir.path().join("store.json");
    JsonFileStore::create(&store_path, snapshot)?;
    Ok((dir, store_path))
}

fn docshield(dir: &Path, store: &Path) -> Command {
    let mut cmd = Command::cargo_bin("docshield").unwrap();
    cmd.current_dir(dir)
        .env_remove("DOCSHIELD_CONFIG")
        .env_remove("RUST_LOG")
        .env("DOCSHIELD_STORE", store);
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn scan_redacts_stdin_with_a_rule_file() -> Result<()> {
    let dir = TempDir::new()?;
    let rules = dir.path().join("rules.yaml");
    fs::write(
        &rules,
        "rules:\n  - id: ssn\n    name: ssn\n    pattern: '\\d{3}-\\d{2}-\\d{4}'\n    severity: high\n",
    )?;

    let mut cmd = Command::cargo_bin("docshield")?;
    cmd.current_dir(dir.path())
        .env_remove("DOCSHIELD_CONFIG")
        .args(["scan", "--rules", rules.to_str().unwrap(), "--no-summary"])
        .write_stdin("SSN 123-45-6789\nnothing here\n");
    cmd.assert().success().stdout("SSN ███████████\nnothing here\n");
    Ok(())
}

#[test]
fn scan_prints_a_summary_to_stderr() -> Result<()> {
    let dir = TempDir::new()?;
    let rules = dir.path().join("rules.yaml");
    fs::write(
        &rules,
        "rules:\n  - id: ssn\n    name: ssn\n    pattern: '\\d{3}-\\d{2}-\\d{4}'\n    entityType: ssn\n",
    )?;
    let input = dir.path().join("in.txt");
    fs::write(&input, "a 111-22-3333 b 444-55-6666\n")?;

    let mut cmd = Command::cargo_bin("docshield")?;
    cmd.current_dir(dir.path())
        .env_remove("DOCSHIELD_CONFIG")
        .args(["scan", "--rules", rules.to_str().unwrap(), "--input", input.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout("a ███████████ b ███████████\n")
        .stderr(predicate::str::contains("ssn").and(predicate::str::contains("2")));
    Ok(())
}

#[test]
fn scan_with_invalid_rule_file_fails() -> Result<()> {
    let dir = TempDir::new()?;
    let rules = dir.path().join("rules.yaml");
    fs::write(&rules, "rules:\n  - id: broken\n    name: broken\n    pattern: '(unclosed'\n")?;

    let mut cmd = Command::cargo_bin("docshield")?;
    cmd.current_dir(dir.path())
        .args(["scan", "--rules", rules.to_str().unwrap()])
        .write_stdin("text");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error:").and(predicate::str::contains("rule file")));
    Ok(())
}

#[test]
fn redaction_is_blocked_until_the_template_is_enriched() -> Result<()> {
    let (dir, store) = seeded_store()?;

    docshield(dir.path(), &store)
        .args(["redact", "--user", "u1", "--document", "d1", "--template", "t1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'US SSN' (ssn)").and(predicate::str::contains("'t1'")));

    docshield(dir.path(), &store)
        .args(["enrich", "--user", "u1", "--template", "t1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("1 rule(s) updated"));

    docshield(dir.path(), &store)
        .args(["redact", "--user", "u1", "--document", "d1", "--template", "t1"])
        .assert()
        .success()
        .stdout("artifacts/d1.redacted.txt\n");

    let artifact = fs::read_to_string(dir.path().join("artifacts/d1.redacted.txt"))?;
    assert_eq!(artifact, "Patient SSN ███████████, call 555-0100.\n");
    Ok(())
}

#[test]
fn enrich_all_reports_counts_as_json() -> Result<()> {
    let (dir, store) = seeded_store()?;

    let output = docshield(dir.path(), &store)
        .args(["enrich", "--user", "u1", "--all", "--json"])
        .output()?;
    assert!(output.status.success());
    let summary = stdout_json(&output);
    assert_eq!(summary["success"], true);
    assert_eq!(summary["totalTemplates"], 1);
    assert_eq!(summary["updatedTemplates"], 1);
    assert_eq!(summary["updatedRules"], 1);

    // Second run has nothing left to repair.
    let output = docshield(dir.path(), &store)
        .args(["enrich", "--user", "u1", "--all", "--json"])
        .output()?;
    assert_eq!(stdout_json(&output)["updatedRules"], 0);
    Ok(())
}

#[test]
fn report_and_review_round_trip_through_the_store() -> Result<()> {
    let (dir, store) = seeded_store()?;
    docshield(dir.path(), &store)
        .args(["enrich", "--user", "u1", "--all"])
        .assert()
        .success();

    // No report before the first run.
    docshield(dir.path(), &store)
        .args(["report", "--user", "u1", "--document", "d1", "--json"])
        .assert()
        .success()
        .stdout("null\n");

    docshield(dir.path(), &store)
        .args(["redact", "--user", "u1", "--document", "d1", "--template", "t1"])
        .assert()
        .success();

    let output = docshield(dir.path(), &store)
        .args(["report", "--user", "u1", "--document", "d1", "--json"])
        .output()?;
    let report = stdout_json(&output);
    let entities = report["redactedEntities"].as_array().expect("entities");
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0]["type"], "ssn");
    assert_eq!(entities[0]["confirmed"], true);
    let entity_id = entities[0]["id"].as_str().expect("entity id").to_string();

    let output = docshield(dir.path(), &store)
        .args([
            "review", "--user", "u1", "--document", "d1", "--entity", entity_id.as_str(), "--flag", "--feedback",
            "  not an SSN ",
        ])
        .output()?;
    assert!(output.status.success());
    let entity = stdout_json(&output);
    assert_eq!(entity["confirmed"], false);
    assert_eq!(entity["feedback"], "not an SSN");

    docshield(dir.path(), &store)
        .args(["report", "--user", "u1", "--document", "d1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flagged").and(predicate::str::contains("not an SSN")));
    Ok(())
}

#[test]
fn other_users_cannot_read_the_report() -> Result<()> {
    let (dir, store) = seeded_store()?;
    docshield(dir.path(), &store)
        .args(["report", "--user", "intruder", "--document", "d1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed"));
    Ok(())
}

#[test]
fn unknown_template_is_reported_as_not_found() -> Result<()> {
    let (dir, store) = seeded_store()?;
    docshield(dir.path(), &store)
        .args(["enrich", "--user", "u1", "--template", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'missing' not found"));
    Ok(())
}

#[test]
fn review_without_a_change_is_rejected() -> Result<()> {
    let (dir, store) = seeded_store()?;
    docshield(dir.path(), &store)
        .args(["review", "--user", "u1", "--document", "d1", "--entity", "e1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input"));
    Ok(())
}

#[test]
fn enrich_requires_a_target() {
    Command::cargo_bin("docshield")
        .unwrap()
        .args(["enrich", "--user", "u1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--template").or(predicate::str::contains("--all")));
}
