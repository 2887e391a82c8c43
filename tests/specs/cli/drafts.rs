// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `outbox draft`.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn outbox(temp: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("outbox");
    cmd.arg("--dir").arg(temp.path()).env_remove("OUTBOX_DIR");
    cmd
}

fn show(temp: &TempDir, key: &str) -> serde_json::Value {
    let output = outbox(temp).args(["draft", "show", key]).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn save_show_and_overwrite() {
    let temp = TempDir::new().unwrap();
    outbox(&temp)
        .args(["draft", "save", "intake", r#"{"step":1}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved draft intake"));
    assert_eq!(show(&temp, "intake"), serde_json::json!({"step": 1}));

    outbox(&temp)
        .args(["draft", "save", "intake", r#"{"step":2}"#])
        .assert()
        .success();
    assert_eq!(show(&temp, "intake"), serde_json::json!({"step": 2}));
}

#[test]
fn save_from_stdin() {
    let temp = TempDir::new().unwrap();
    outbox(&temp)
        .args(["draft", "save", "visit", "-"])
        .write_stdin(r#"{"notes":"pending"}"#)
        .assert()
        .success();
    assert_eq!(show(&temp, "visit")["notes"], "pending");
}

#[test]
fn list_and_remove() {
    let temp = TempDir::new().unwrap();
    for key in ["a", "b"] {
        outbox(&temp)
            .args(["draft", "save", key, "{}"])
            .assert()
            .success();
    }

    let output = outbox(&temp)
        .args(["draft", "list", "-o", "json"])
        .output()
        .unwrap();
    let drafts: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(drafts.len(), 2);

    outbox(&temp)
        .args(["draft", "rm", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted draft a"));
    outbox(&temp)
        .args(["draft", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  b"))
        .stdout(predicate::str::contains("  a\n").not());
}

#[test]
fn missing_draft_is_an_error() {
    let temp = TempDir::new().unwrap();
    for sub in ["show", "rm"] {
        outbox(&temp)
            .args(["draft", sub, "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("draft not found: nope"));
    }
}

#[test]
fn drafts_count_in_stats() {
    let temp = TempDir::new().unwrap();
    outbox(&temp)
        .args(["draft", "save", "k", "[]"])
        .assert()
        .success();
    outbox(&temp)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Drafts: 1"));
}
