// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber setup for the binary.

use std::fs;
use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber, writing to `log_path` when it can be
/// opened and to stderr otherwise.
pub fn setup(log_path: &Path, debug: bool) {
    let filter = filter(
        outbound::env::log_filter(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        debug,
    );

    // A subscriber may already be installed when embedded; keep it.
    if let Ok(file) = fs::OpenOptions::new().create(true).append(true).open(log_path) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// `OUTBOUND_LOG` wins over `RUST_LOG`; unparsable directives fall through.
fn filter(outbound_log: Option<String>, rust_log: Option<String>, debug: bool) -> EnvFilter {
    outbound_log
        .into_iter()
        .chain(rust_log)
        .find_map(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(if debug { "debug" } else { "warn" }))
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
