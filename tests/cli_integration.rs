// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the charnet CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// charnet, run from the crate root against the fixture catalog
///
/// The user config directory points at an empty scratch directory so a real
/// `config.toml` on the machine cannot leak into the tests.
fn charnet(scratch: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("charnet").unwrap();
    cmd.current_dir(manifest_dir())
        .env("XDG_CONFIG_HOME", scratch.path())
        .env("HOME", scratch.path())
        .env_remove("RUST_LOG")
        .env_remove("CHARNET_CONFIG")
        .args(["--no-color", "--config", "tests/fixtures/catalog.toml"]);
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_phases_lists_catalog() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .arg("phases")
        .assert()
        .success()
        .stdout(predicate::str::contains("square"))
        .stdout(predicate::str::contains("Household Pressure"))
        .stdout(predicate::str::contains("Four characters in a ring"));
}

#[test]
fn test_phases_json() {
    let scratch = TempDir::new().unwrap();

    let output = charnet(&scratch).args(["--json", "phases"]).output().unwrap();
    assert!(output.status.success());

    let phases = stdout_json(&output);
    assert_eq!(phases.as_array().unwrap().len(), 3);
    assert_eq!(phases[1]["reflection"]["title"], "Intrusion");
}

#[test]
fn test_metrics_square() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .args(["metrics", "--phase", "square"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Square Garden"))
        .stdout(predicate::str::contains("Nodes 4"))
        .stdout(predicate::str::contains("Edges 4"))
        .stdout(predicate::str::contains("Density 0.6667"))
        .stdout(predicate::str::contains("Top by Betweenness"))
        .stdout(predicate::str::contains("Baoyu"));
}

#[test]
fn test_metrics_json_counts_and_rejections() {
    let scratch = TempDir::new().unwrap();

    let output = charnet(&scratch)
        .args(["--json", "metrics", "--phase", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["phase"]["key"], "household");
    assert_eq!(value["summary"]["nodes"], 8);
    assert_eq!(value["summary"]["edges"], 8);
    assert_eq!(value["build"]["dangling_edges"], 1);
    assert_eq!(value["rejected"].as_array().unwrap().len(), 1);
    assert_eq!(value["top_degree"].as_array().unwrap().len(), 3);
    assert_eq!(value["top_degree"][0]["label"], "Baoyu");
}

#[test]
fn test_metrics_warns_about_skipped_rows() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .args(["metrics", "--phase", "household"])
        .assert()
        .success()
        .stderr(predicate::str::contains("malformed row"))
        .stderr(predicate::str::contains("unknown characters"));
}

#[test]
fn test_strict_rows_fail_the_load() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .args(["--strict", "metrics", "--phase", "household"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load phase"))
        .stderr(predicate::str::contains("not a number"));
}

#[test]
fn test_missing_column_fails() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .args(["metrics", "--phase", "broken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no `id` column"));
}

#[test]
fn test_missing_table_fails() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .args([
            "metrics",
            "--nodes",
            "tests/fixtures/does_not_exist.csv",
            "--edges",
            "tests/fixtures/square_edges.csv",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load phase"));
}

#[test]
fn test_unknown_phase() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .args(["metrics", "--phase", "epilogue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown phase: epilogue"));
}

#[test]
fn test_phase_conflicts_with_ad_hoc_tables() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .args([
            "metrics",
            "--phase",
            "square",
            "--nodes",
            "tests/fixtures/square_nodes.csv",
            "--edges",
            "tests/fixtures/square_edges.csv",
        ])
        .assert()
        .failure();
}

#[test]
fn test_ad_hoc_tables() {
    let scratch = TempDir::new().unwrap();

    let output = charnet(&scratch)
        .args([
            "--json",
            "metrics",
            "--nodes",
            "tests/fixtures/square_nodes.csv",
            "--edges",
            "tests/fixtures/square_edges.csv",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["phase"]["key"], "custom");
    assert_eq!(value["summary"]["edges"], 4);
}

#[test]
fn test_seeded_runs_are_identical() {
    let scratch = TempDir::new().unwrap();
    let run = || {
        charnet(&scratch)
            .args(["--json", "metrics", "--phase", "household", "--seed", "42"])
            .output()
            .unwrap()
            .stdout
    };

    assert_eq!(run(), run());
}

#[test]
fn test_render_writes_dashboard() {
    let scratch = TempDir::new().unwrap();
    let out = scratch.path().join("dashboard.html");

    charnet(&scratch)
        .args(["render", "--phase", "household", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote dashboard"));

    let html = std::fs::read_to_string(&out).unwrap();
    assert!(html.contains("<h1>Household Pressure</h1>"));
    assert!(html.contains("Xiren bridges the garden"));
    assert!(html.contains("Loss of the ideal: the household rewrites the garden."));
    assert!(html.contains("row(s) were skipped"));
    assert!(html.contains("<svg"));
}

#[test]
fn test_export_dot_to_stdout() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .args(["export", "--phase", "square", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("graph phase {"))
        .stdout(predicate::str::contains("\"A\" -- \"B\""));
}

#[test]
fn test_export_json_to_file() {
    let scratch = TempDir::new().unwrap();
    let out = scratch.path().join("square.json");

    charnet(&scratch)
        .args(["export", "--phase", "square", "--format", "json", "-o"])
        .arg(&out)
        .assert()
        .success();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["layout"]["nodes"].as_array().unwrap().len(), 4);
    assert_eq!(value["summary"]["density"].as_f64().unwrap(), 4.0 / 6.0);
}

#[test]
fn test_config_key_and_dump() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .args(["config", "report.top_n"])
        .assert()
        .success()
        .stdout("3\n");

    charnet(&scratch)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[community]"))
        .stdout(predicate::str::contains("seed = 0"));
}

#[test]
fn test_config_env_override() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .env("CHARNET_COMMUNITY__SEED", "7")
        .args(["config", "community.seed"])
        .assert()
        .success()
        .stdout("7\n");
}

#[test]
fn test_missing_config_file_fails() {
    let scratch = TempDir::new().unwrap();

    Command::cargo_bin("charnet")
        .unwrap()
        .current_dir(manifest_dir())
        .env("XDG_CONFIG_HOME", scratch.path())
        .env("HOME", scratch.path())
        .args(["--config", "tests/fixtures/nope.toml", "phases"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_completions() {
    let scratch = TempDir::new().unwrap();

    charnet(&scratch)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("charnet"));
}
