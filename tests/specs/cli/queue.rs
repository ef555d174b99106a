// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for queueing, inspecting and flushing calls.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use common::*;

#[test]
fn track_is_queued_under_a_temporary_id() {
    let state = TempDir::new().unwrap();
    outbound(&state)
        .args(["track", "opened", "--props", r#"{"screen":"home"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("queued track (1 pending)"));

    let status = status(&state);
    assert_eq!(status["pending"], 1);
    assert!(status["temporary_user_id"].is_string());
    assert!(status["user_id"].is_null());
    assert_eq!(status["reachability"], "unreachable");
}

#[test]
fn calls_accumulate_across_invocations() {
    let state = TempDir::new().unwrap();
    run(&state, &["track", "a"]);
    run(&state, &["track", "b"]);
    run(&state, &["track", "c"]);

    assert_eq!(status(&state)["pending"], 3);
}

#[test]
fn temporary_id_is_stable_across_invocations() {
    let state = TempDir::new().unwrap();
    run(&state, &["track", "a"]);
    let first = status(&state)["temporary_user_id"].clone();
    run(&state, &["track", "b"]);

    assert_eq!(status(&state)["temporary_user_id"], first);
}

#[test]
fn queue_is_written_to_the_state_dir() {
    let state = TempDir::new().unwrap();
    run(&state, &["track", "opened"]);

    let raw = std::fs::read_to_string(state.path().join("queue.json")).unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(snapshot["version"], 1);
    assert_eq!(snapshot["data"]["pending_calls"][0]["path"], "track");
}

#[test]
fn status_text_output() {
    let state = TempDir::new().unwrap();
    run(&state, &["track", "opened"]);

    outbound(&state)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending calls: 1"))
        .stdout(predicate::str::contains("User id: (none)"))
        .stdout(predicate::str::contains("Reachability: unreachable"))
        .stdout(predicate::str::contains("Persistence: disk"));
}

#[test]
fn flush_offline_keeps_the_queue() {
    let state = TempDir::new().unwrap();
    run(&state, &["track", "opened"]);

    outbound(&state)
        .args(["flush", "--timeout-secs", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("1 call(s) still pending"));

    assert_eq!(status(&state)["pending"], 1);
}

#[test]
fn flush_with_empty_queue_succeeds() {
    let state = TempDir::new().unwrap();
    outbound(&state)
        .args(["flush", "--timeout-secs", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("queue drained"));
}

#[test]
fn config_offline_without_cache() {
    let state = TempDir::new().unwrap();
    outbound(&state)
        .args(["config", "--refresh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no remote config available"));
}

#[test]
fn cached_remote_kill_ignores_calls() {
    let state = TempDir::new().unwrap();
    std::fs::write(
        state.path().join("remote_config.json"),
        r#"{"version":1,"data":{"remote_kill":true,"fetched_at":"2026-01-01T00:00:00Z"}}"#,
    )
    .unwrap();

    run(&state, &["track", "opened"]);

    let status = status(&state);
    assert_eq!(status["remote_kill"], true);
    assert_eq!(status["pending"], 0);
}

#[test]
fn debug_flush_is_logged_to_the_state_dir() {
    let state = TempDir::new().unwrap();
    run(&state, &["track", "opened"]);

    outbound(&state).args(["--debug", "flush", "--timeout-secs", "0"]).assert().failure();

    let log = std::fs::read_to_string(state.path().join("outbound.log")).unwrap();
    assert!(log.contains("cli started"), "log was: {log}");
    assert!(log.contains("flushing queued calls"), "log was: {log}");
    assert!(log.contains("flush finished"), "log was: {log}");
}
