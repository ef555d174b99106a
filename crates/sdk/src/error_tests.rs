// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::path::PathBuf;
use yare::parameterized;

#[parameterized(
    settings = { Error::Settings("bad toml".into()), "invalid settings: bad toml" },
    transport = { Error::Transport(TransportError::Timeout), "transport error: request timed out" },
    no_runtime = { Error::NoRuntime, "no async runtime\n  hint: start the dispatcher from within a tokio runtime" },
)]
fn error_display(err: Error, expected: &str) {
    assert_eq!(err.to_string(), expected);
}

#[test]
fn core_errors_are_transparent() {
    let core = ob_core::Error::StateDirLocked(PathBuf::from("/tmp/x"));
    let expected = core.to_string();
    let err: Error = core.into();
    assert_eq!(err.to_string(), expected);
}
