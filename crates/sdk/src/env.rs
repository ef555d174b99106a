// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns `OUTBOUND_API_KEY` if set and non-empty.
pub fn api_key() -> Option<String> {
    std::env::var(vars::OUTBOUND_API_KEY).ok().filter(|v| !v.is_empty())
}

/// Returns the value of `OUTBOUND_STATE_DIR` if set.
pub fn state_dir() -> Option<PathBuf> {
    std::env::var(vars::OUTBOUND_STATE_DIR).ok().map(PathBuf::from)
}

/// Returns the log filter directive from `OUTBOUND_LOG` if set.
pub fn log_filter() -> Option<String> {
    std::env::var(vars::OUTBOUND_LOG).ok()
}

/// Returns the value of `XDG_STATE_HOME` if set.
pub fn xdg_state_home() -> Option<PathBuf> {
    std::env::var(vars::XDG_STATE_HOME).ok().map(PathBuf::from)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
