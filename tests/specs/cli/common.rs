// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test files,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// `outbound` against `state`, offline, with a clean environment.
pub fn outbound(state: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("outbound");
    cmd.arg("--state-dir")
        .arg(state.path())
        .arg("--offline")
        .env_remove("OUTBOUND_API_KEY")
        .env_remove("OUTBOUND_STATE_DIR")
        .env_remove("OUTBOUND_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// Runs `args` and asserts success.
pub fn run(state: &TempDir, args: &[&str]) {
    outbound(state).args(args).assert().success();
}

/// Parsed `status --json` output.
pub fn status(state: &TempDir) -> serde_json::Value {
    let output = outbound(state).args(["status", "--json"]).output().unwrap();
    assert!(output.status.success(), "status failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}
