// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for queueing and inspecting mutations without a network.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use yare::parameterized;

fn outbox(temp: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("outbox");
    cmd.arg("--dir")
        .arg(temp.path())
        .env_remove("OUTBOX_DIR")
        .env_remove("OUTBOX_CREDENTIAL");
    cmd
}

fn enqueue(temp: &TempDir, kind: &str, payload: &str) -> String {
    let output = outbox(temp)
        .args(["enqueue", kind, payload, "-c", "Bearer tok"])
        .output()
        .unwrap();
    assert!(output.status.success(), "enqueue failed: {output:?}");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn list_json(temp: &TempDir, args: &[&str]) -> Vec<serde_json::Value> {
    let output = outbox(temp)
        .arg("list")
        .args(args)
        .args(["-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// Enqueue
// =============================================================================

#[test]
fn enqueue_prints_id_and_persists() {
    let temp = TempDir::new().unwrap();
    let id = enqueue(&temp, "notes", r#"{"name":"A"}"#);
    assert!(id.starts_with("mut-"), "unexpected id {id}");

    let listed = list_json(&temp, &[]);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());
    assert_eq!(listed[0]["status"], "pending");
    assert_eq!(listed[0]["payload"]["name"], "A");
}

#[test]
fn enqueue_keeps_fifo_order_across_processes() {
    let temp = TempDir::new().unwrap();
    let ids: Vec<String> = ["A", "B", "C"]
        .iter()
        .map(|name| enqueue(&temp, "notes", &format!(r#"{{"name":"{name}"}}"#)))
        .collect();

    let listed: Vec<String> = list_json(&temp, &[])
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(listed, ids);
}

#[test]
fn enqueue_reads_payload_from_stdin() {
    let temp = TempDir::new().unwrap();
    outbox(&temp)
        .args(["enqueue", "audit", "-", "-c", "Bearer tok"])
        .write_stdin(r#"{"event":"login"}"#)
        .assert()
        .success();

    let listed = list_json(&temp, &["-k", "audit"]);
    assert_eq!(listed[0]["payload"]["event"], "login");
}

#[test]
fn enqueue_takes_credential_from_env() {
    let temp = TempDir::new().unwrap();
    outbox(&temp)
        .args(["enqueue", "notes", "{}"])
        .env("OUTBOX_CREDENTIAL", "Bearer env")
        .assert()
        .success();
}

#[test]
fn enqueue_without_credential_fails_with_hint() {
    let temp = TempDir::new().unwrap();
    outbox(&temp)
        .args(["enqueue", "notes", "{}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no credential given"))
        .stderr(predicate::str::contains("OUTBOX_CREDENTIAL"));
}

#[parameterized(
    bad_json = { "notes", "{not json", "invalid JSON payload" },
    bad_kind = { "Not Valid", "{}", "invalid resource kind" },
)]
fn enqueue_rejects_bad_input(kind: &str, payload: &str, message: &str) {
    let temp = TempDir::new().unwrap();
    outbox(&temp)
        .args(["enqueue", kind, payload, "-c", "t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(message));

    outbox(&temp)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending: 0"));
}

// =============================================================================
// List
// =============================================================================

#[test]
fn list_never_prints_credentials() {
    let temp = TempDir::new().unwrap();
    enqueue(&temp, "notes", "{}");

    outbox(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("[pending] notes attempts=0"))
        .stdout(predicate::str::contains("Bearer").not());
    outbox(&temp)
        .args(["list", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bearer").not());
}

#[test]
fn list_filters_by_kind_and_status() {
    let temp = TempDir::new().unwrap();
    enqueue(&temp, "notes", "{}");
    enqueue(&temp, "vitals", "{}");

    assert_eq!(list_json(&temp, &["-k", "vitals"]).len(), 1);
    assert_eq!(list_json(&temp, &["-s", "pending"]).len(), 2);
    assert!(list_json(&temp, &["-s", "failed"]).is_empty());
}

#[test]
fn list_rejects_unknown_status() {
    let temp = TempDir::new().unwrap();
    outbox(&temp)
        .args(["list", "-s", "sent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid status"));
}

// =============================================================================
// Status and stats
// =============================================================================

#[test]
fn stats_count_pending() {
    let temp = TempDir::new().unwrap();
    enqueue(&temp, "notes", "{}");
    enqueue(&temp, "notes", "{}");

    let output = outbox(&temp)
        .args(["stats", "-o", "json"])
        .output()
        .unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["pending"], 2);
    assert_eq!(stats["dead_letters"], 0);
}

#[test]
fn status_without_probe_leaves_state_unknown() {
    let temp = TempDir::new().unwrap();
    enqueue(&temp, "notes", "{}");

    outbox(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("State: unknown"))
        .stdout(predicate::str::contains("Pending: 1"))
        .stdout(predicate::str::contains("Last sync: never"));
}

// =============================================================================
// Remediation errors
// =============================================================================

#[test]
fn retry_unknown_id_fails() {
    let temp = TempDir::new().unwrap();
    outbox(&temp)
        .args(["retry", "mut-missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mutation not found"));
}

#[test]
fn discard_requires_dead_letter() {
    let temp = TempDir::new().unwrap();
    let id = enqueue(&temp, "notes", "{}");
    outbox(&temp)
        .args(["discard", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not failed-permanent"));

    assert_eq!(list_json(&temp, &[]).len(), 1);
}

#[test]
fn retry_all_with_nothing_dead() {
    let temp = TempDir::new().unwrap();
    outbox(&temp)
        .args(["retry", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Requeued 0 dead letter(s)"));
}
