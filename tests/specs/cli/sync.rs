// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for `outbox sync` against a mock remote.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn outbox(temp: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("outbox");
    cmd.arg("--dir")
        .arg(temp.path())
        .env_remove("OUTBOX_DIR")
        .env_remove("OUTBOX_CREDENTIAL");
    cmd
}

/// State directory pointing at `url` with a short retry budget.
fn setup(url: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let config = format!(
        "[remote]\nurl = \"{url}\"\ntimeout_secs = 5\n\n\
         [remote.endpoints]\ninterventions = \"/api/interventions\"\n\n\
         [retry]\nmax_attempts = 3\n"
    );
    std::fs::write(temp.path().join("config.toml"), config).unwrap();
    temp
}

fn enqueue(temp: &TempDir, name: &str) -> String {
    let output = outbox(temp)
        .args(["enqueue", "interventions"])
        .arg(json!({ "name": name }).to_string())
        .args(["-c", "Bearer tok"])
        .output()
        .unwrap();
    assert!(output.status.success(), "enqueue failed: {output:?}");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn sync_json(temp: &TempDir) -> serde_json::Value {
    let output = outbox(temp)
        .args(["sync", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "sync failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

fn list_json(temp: &TempDir, args: &[&str]) -> Vec<serde_json::Value> {
    let output = outbox(temp)
        .arg("list")
        .args(args)
        .args(["-o", "json"])
        .output()
        .unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

async fn accept_all(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/interventions"))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
}

async fn reject_name(server: &MockServer, name: &str) {
    Mock::given(method("POST"))
        .and(path("/api/interventions"))
        .and(body_partial_json(json!({ "name": name })))
        .respond_with(ResponseTemplate::new(422).set_body_string("name not allowed"))
        .with_priority(1)
        .mount(server)
        .await;
}

// =============================================================================
// Delivery
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn offline_queue_drains_in_order_with_dead_letter() {
    let server = MockServer::start().await;
    reject_name(&server, "C").await;
    accept_all(&server).await;
    let temp = setup(&server.uri());

    for name in ["A", "B", "C"] {
        enqueue(&temp, name);
    }

    outbox(&temp)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Delivered 2, dead-lettered 1, remaining 0",
        ));

    let names: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["name"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(names, vec!["A", "B", "C"]);

    let dead = list_json(&temp, &["-s", "failed-permanent"]);
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0]["payload"]["name"], "C");
    assert_eq!(dead[0]["attempts"], 1);
    assert!(dead[0]["last_error"]
        .as_str()
        .unwrap()
        .contains("name not allowed"));

    outbox(&temp)
        .args(["status", "--probe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("State: connected-error"))
        .stdout(predicate::str::contains("Dead letters: 1"))
        .stdout(predicate::str::contains("Last error: rejected with HTTP 422"));
}

#[tokio::test(flavor = "multi_thread")]
async fn request_carries_credential_and_idempotency_key() {
    let server = MockServer::start().await;
    accept_all(&server).await;
    let temp = setup(&server.uri());
    let id = enqueue(&temp, "A");

    assert_eq!(sync_json(&temp)["delivered"], 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;
    assert_eq!(headers.get("authorization").unwrap(), "Bearer tok");
    assert_eq!(headers.get("idempotency-key").unwrap(), id.as_str());
    assert!(list_json(&temp, &[]).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_keeps_record_pending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let temp = setup(&server.uri());
    enqueue(&temp, "A");

    let report = sync_json(&temp);
    assert_eq!(report["delivered"], 0);
    assert_eq!(report["failed_permanent"], 0);
    assert_eq!(report["remaining"], 1);

    let pending = list_json(&temp, &[]);
    assert_eq!(pending[0]["status"], "pending");
    assert_eq!(pending[0]["attempts"], 1);
    assert_eq!(pending[0]["last_error"], "server error: HTTP 503");
    assert!(pending[0]["next_attempt_at"].is_string());
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_remote_sends_nothing() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let temp = setup(&format!("http://127.0.0.1:{port}"));
    enqueue(&temp, "A");

    outbox(&temp)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Remote unreachable, nothing sent (1 pending)"));

    let pending = list_json(&temp, &[]);
    assert_eq!(pending[0]["attempts"], 0);
}

// =============================================================================
// Remediation
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn retry_dead_letter_then_deliver() {
    let rejecting = MockServer::start().await;
    reject_name(&rejecting, "A").await;
    let temp = setup(&rejecting.uri());
    let id = enqueue(&temp, "A");
    assert_eq!(sync_json(&temp)["failed_permanent"], 1);

    outbox(&temp)
        .args(["retry", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Requeued {id}")));

    // The server has been fixed.
    let fixed = MockServer::start().await;
    accept_all(&fixed).await;
    let config = std::fs::read_to_string(temp.path().join("config.toml"))
        .unwrap()
        .replace(&rejecting.uri(), &fixed.uri());
    std::fs::write(temp.path().join("config.toml"), config).unwrap();

    assert_eq!(sync_json(&temp)["delivered"], 1);
    outbox(&temp)
        .args(["status", "--probe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("State: connected-idle"))
        .stdout(predicate::str::contains("Dead letters: 0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn discard_removes_dead_letter() {
    let server = MockServer::start().await;
    reject_name(&server, "A").await;
    let temp = setup(&server.uri());
    let id = enqueue(&temp, "A");
    sync_json(&temp);

    outbox(&temp)
        .args(["discard", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Discarded {id}")));
    assert!(list_json(&temp, &[]).is_empty());
}
