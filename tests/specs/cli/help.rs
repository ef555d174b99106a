// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Specs for help and version output.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use yare::parameterized;

#[test]
fn version_flag() {
    cargo_bin_cmd!("outbound")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[parameterized(
    track = { "track" },
    identify = { "identify" },
    alias = { "alias" },
    group = { "group" },
    register_token = { "register-token" },
    disable_token = { "disable-token" },
    logout = { "logout" },
    status = { "status" },
    flush = { "flush" },
    config = { "config" },
)]
fn help_lists_command(name: &str) {
    cargo_bin_cmd!("outbound")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(name));
}

#[test]
fn missing_command_is_a_usage_error() {
    cargo_bin_cmd!("outbound").assert().failure().code(2);
}
