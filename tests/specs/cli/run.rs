// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `outbox run`, the long-lived host mode.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::io::{BufRead, BufReader, Write};
use std::process::Stdio;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn outbox(temp: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("outbox");
    cmd.arg("--dir")
        .arg(temp.path())
        .env_remove("OUTBOX_DIR")
        .env_remove("OUTBOX_CREDENTIAL");
    cmd
}

fn setup(url: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("config.toml"),
        format!("[remote]\nurl = \"{url}\"\ntimeout_secs = 5\n"),
    )
    .unwrap();
    temp
}

fn enqueue(temp: &TempDir, name: &str) {
    outbox(temp)
        .args(["enqueue", "notes"])
        .arg(json!({ "name": name }).to_string())
        .args(["-c", "Bearer tok"])
        .assert()
        .success();
}

/// Runs the host with `input` on stdin and returns its stdout lines as JSON.
fn run_host(temp: &TempDir, input: &str) -> Vec<Value> {
    let output = outbox(temp).arg("run").write_stdin(input).output().unwrap();
    assert!(output.status.success(), "run failed: {output:?}");
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn last_status(lines: &[Value]) -> &Value {
    lines
        .iter()
        .rev()
        .find(|v| v["type"] == "status")
        .expect("no status line")
}

async fn accepting_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn online_message_drains_queue_before_exit() {
    let server = accepting_server().await;
    let temp = setup(&server.uri());
    enqueue(&temp, "A");
    enqueue(&temp, "B");

    let lines = run_host(&temp, "{\"type\":\"online\"}\n");

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    let status = last_status(&lines);
    assert_eq!(status["state"], "connected-idle");
    assert_eq!(status["pending_count"], 0);
    assert!(status["last_sync_at"].is_string());

    outbox(&temp)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending: 0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn staying_offline_sends_nothing() {
    let server = accepting_server().await;
    let temp = setup(&server.uri());
    enqueue(&temp, "A");

    let lines = run_host(&temp, "{\"type\":\"offline\"}\n");

    assert!(server.received_requests().await.unwrap().is_empty());
    let status = last_status(&lines);
    assert_eq!(status["state"], "disconnected");
    assert_eq!(status["pending_count"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_lines_are_ignored() {
    let server = accepting_server().await;
    let temp = setup(&server.uri());
    enqueue(&temp, "A");

    let lines = run_host(
        &temp,
        "not json\n{\"type\":\"reboot\"}\n\n{\"type\":\"online\"}\n",
    );

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(last_status(&lines)["pending_count"], 0);
}

#[test]
fn empty_input_exits_cleanly() {
    let temp = setup("http://127.0.0.1:9");
    let lines = run_host(&temp, "");
    assert_eq!(last_status(&lines)["state"], "disconnected");
    assert!(temp.path().join("outbox.log").exists());
}

#[test]
fn idle_host_is_not_reported_as_syncing() {
    let temp = setup("http://127.0.0.1:9");
    let mut host = std::process::Command::new(env!("CARGO_BIN_EXE_outbox"))
        .arg("--dir")
        .arg(temp.path())
        .arg("run")
        .env_remove("OUTBOX_DIR")
        .env_remove("OUTBOX_CREDENTIAL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let mut stdin = host.stdin.take().unwrap();
    let mut stdout = BufReader::new(host.stdout.take().unwrap());

    stdin.write_all(b"{\"type\":\"online\"}\n").unwrap();
    stdin.flush().unwrap();
    let mut line = String::new();
    loop {
        line.clear();
        stdout.read_line(&mut line).unwrap();
        let status: Value = serde_json::from_str(&line).unwrap();
        if status["type"] == "status" && status["is_online"] == true {
            break;
        }
    }

    // The host owns the queue, but no run is in progress.
    outbox(&temp).arg("sync").assert().failure();
    let output = outbox(&temp)
        .args(["status", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let view: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["is_syncing"], false);

    drop(stdin);
    assert!(host.wait().unwrap().success());
}
