// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ob-core: data model and persistence for the outbound delivery layer
//!
//! This crate provides the queued call records, the identity rules applied to
//! the queue, the remote config snapshot and the on-disk state directory used
//! by the `outbound` runtime and CLI. It performs no network I/O.

pub mod backoff;
pub mod call;
pub mod clock;
pub mod error;
pub mod remote_config;
pub mod state;
pub mod store;

pub use backoff::{BackoffPolicy, RetryDecision};
pub use call::{paths, CallRecord, Identity};
pub use clock::{ClockSource, SystemClock};
pub use error::{Error, Result};
pub use remote_config::{RemoteConfigSnapshot, SdkConfigResponse};
pub use state::{IdentityTransition, QueueState};
pub use store::StateDir;
