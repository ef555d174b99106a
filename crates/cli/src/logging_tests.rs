// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    default_is_warn = { None, None, false, "warn" },
    debug_raises_default = { None, None, true, "debug" },
    outbound_log_wins = { Some("info"), Some("trace"), false, "info" },
    rust_log_fallback = { None, Some("trace"), true, "trace" },
    outbound_log_beats_debug = { Some("error"), None, true, "error" },
)]
fn filter_precedence(outbound_log: Option<&str>, rust_log: Option<&str>, debug: bool, expected: &str) {
    let filter = filter(outbound_log.map(String::from), rust_log.map(String::from), debug);
    assert_eq!(filter.to_string(), expected);
}
