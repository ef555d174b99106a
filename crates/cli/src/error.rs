// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors reported by the `outbound` binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sdk(#[from] outbound::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid JSON for {flag}: {reason}\n  hint: pass a JSON object, e.g. '{{\"key\": \"value\"}}'")]
    InvalidJson { flag: &'static str, reason: String },

    #[error("invalid push token: {0}\n  hint: pass the device token as an even number of hex digits")]
    InvalidToken(String),

    #[error("{pending} call(s) still pending after {timeout_secs}s\n  hint: check connectivity, or raise --timeout-secs")]
    FlushTimeout { pending: usize, timeout_secs: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
