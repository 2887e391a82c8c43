// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    online = { r#"{"type":"online"}"#, HostInput::Connectivity(true) },
    offline = { r#"{"type":"offline"}"#, HostInput::Connectivity(false) },
    started = { r#"{"type":"sync-started"}"#, HostInput::Signal(BackgroundSignal::SyncStarted) },
    item = { r#"{"type":"item-synced","success":false}"#, HostInput::Signal(BackgroundSignal::ItemSynced { success: false }) },
    completed = { r#"{"type":"sync-completed","error":"quota"}"#, HostInput::Signal(BackgroundSignal::SyncCompleted { error: Some("quota".to_string()) }) },
)]
fn routes_host_messages(line: &str, expected: HostInput) {
    assert_eq!(HostMessage::parse(line).unwrap().route(), expected);
}

#[parameterized(
    not_json = { "online" },
    unknown_type = { r#"{"type":"reboot"}"# },
    missing_field = { r#"{"type":"item-synced"}"# },
)]
fn rejects_bad_lines(line: &str) {
    assert!(matches!(
        HostMessage::parse(line),
        Err(Error::InvalidJson { .. })
    ));
}

#[test]
fn registration_is_one_json_line() {
    let host = LineHost::new(Vec::new());
    host.request_background_sync("outbox-sync").unwrap();
    host.request_background_sync("outbox-sync").unwrap();

    let out = String::from_utf8(host.into_inner()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"type": "request-background-sync", "tag": "outbox-sync"})
    );
}

#[test]
fn status_line_flattens_snapshot() {
    let host = LineHost::new(Vec::new());
    host.write_status(&SyncStatus::new(true, 2, 1)).unwrap();

    let out = String::from_utf8(host.into_inner()).unwrap();
    let value: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
    assert_eq!(value["type"], "status");
    assert_eq!(value["state"], "connected-idle");
    assert_eq!(value["pending_count"], 2);
    assert_eq!(value["dead_letter_count"], 1);
}
