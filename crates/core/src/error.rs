// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for ob-core operations.

use std::path::PathBuf;

use thiserror::Error;

/// All possible errors that can occur in ob-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported snapshot version {found} (this build reads up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("state directory {} is in use by another process\n  hint: only one instance may own a state directory", .0.display())]
    StateDirLocked(PathBuf),

    #[error("invalid call: {0}")]
    InvalidCall(String),
}

/// A specialized Result type for ob-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
