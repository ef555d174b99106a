// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for identity changes made through the CLI.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use common::*;

fn queued_calls(state: &TempDir) -> Vec<serde_json::Value> {
    let raw = std::fs::read_to_string(state.path().join("queue.json")).unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&raw).unwrap();
    snapshot["data"]["pending_calls"].as_array().cloned().unwrap_or_default()
}

#[test]
fn identify_links_earlier_anonymous_calls() {
    let state = TempDir::new().unwrap();
    run(&state, &["track", "opened"]);
    run(&state, &["identify", "u1", "--attrs", r#"{"email":"ada@example.com"}"#]);

    let status = status(&state);
    assert_eq!(status["user_id"], "u1");
    // track, link identify, identify
    assert_eq!(status["pending"], 3);

    let calls = queued_calls(&state);
    let paths: Vec<_> = calls.iter().map(|c| c["path"].as_str().unwrap()).collect();
    assert_eq!(paths, ["track", "identify", "identify"]);
    assert_eq!(calls[2]["parameters"]["email"], "ada@example.com");
}

#[test]
fn alias_moves_the_current_user() {
    let state = TempDir::new().unwrap();
    run(&state, &["identify", "u1"]);
    run(&state, &["alias", "u2"]);

    assert_eq!(status(&state)["user_id"], "u2");
}

#[test]
fn group_identifies_the_user() {
    let state = TempDir::new().unwrap();
    run(&state, &["group", "g1", "u1", "--group-attrs", r#"{"plan":"pro"}"#]);

    assert_eq!(status(&state)["user_id"], "u1");
    let calls = queued_calls(&state);
    let last = calls.last().unwrap();
    assert_eq!(last["parameters"]["group_id"], "g1");
    assert_eq!(last["parameters"]["group_attributes"]["plan"], "pro");
}

#[test]
fn token_lifecycle() {
    let state = TempDir::new().unwrap();
    run(&state, &["identify", "u1"]);
    run(&state, &["register-token", "deadbeef"]);
    assert_eq!(status(&state)["has_push_token"], true);

    run(&state, &["logout"]);

    let status = status(&state);
    assert!(status["user_id"].is_null());
    let calls = queued_calls(&state);
    let last = calls.last().unwrap();
    assert_eq!(last["path"], "apns/disable");
    assert_eq!(last["parameters"]["token"], "deadbeef");
}

#[test]
fn disable_token_without_registration_is_a_no_op() {
    let state = TempDir::new().unwrap();
    outbound(&state)
        .arg("disable-token")
        .assert()
        .success()
        .stdout(predicate::str::contains("no push token registered"));

    assert_eq!(status(&state)["pending"], 0);
}
