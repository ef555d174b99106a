// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by the runtime.
///
/// Delivery and persistence problems never show up here; they are logged
/// and handled by the queue. Only construction and explicit host requests
/// can fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ob_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("no async runtime\n  hint: start the dispatcher from within a tokio runtime")]
    NoRuntime,
}

/// A specialized Result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
