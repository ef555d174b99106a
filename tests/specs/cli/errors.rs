// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for error reporting and damaged state.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use common::*;
use yare::parameterized;

#[parameterized(
    track_props = { &["track", "opened", "--props", "{not json"], "invalid JSON for --props" },
    track_props_array = { &["track", "opened", "--props", "[1]"], "expected an object" },
    identify_attrs = { &["identify", "u1", "--attrs", "nope"], "invalid JSON for --attrs" },
    group_attrs = { &["group", "g1", "u1", "--group-attrs", "1"], "invalid JSON for --group-attrs" },
    bad_token = { &["register-token", "xyz"], "invalid push token" },
)]
fn invalid_arguments_exit_1(args: &[&str], message: &str) {
    let state = TempDir::new().unwrap();
    outbound(&state)
        .args(args)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("error: "))
        .stderr(predicate::str::contains(message));

    assert_eq!(status(&state)["pending"], 0);
}

#[test]
fn corrupt_queue_is_set_aside() {
    let state = TempDir::new().unwrap();
    std::fs::write(state.path().join("queue.json"), "{ truncated").unwrap();

    run(&state, &["track", "opened"]);

    assert_eq!(status(&state)["pending"], 1);
    assert!(state.path().join("queue.json.corrupt").exists());
}

#[test]
fn newer_snapshot_version_is_set_aside() {
    let state = TempDir::new().unwrap();
    std::fs::write(state.path().join("queue.json"), r#"{"version":99,"data":{}}"#).unwrap();

    assert_eq!(status(&state)["pending"], 0);
}

#[test]
fn invalid_settings_are_reported() {
    let state = TempDir::new().unwrap();
    std::fs::write(state.path().join("config.toml"), "[delivery\n").unwrap();

    outbound(&state)
        .arg("status")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid settings"));
}
