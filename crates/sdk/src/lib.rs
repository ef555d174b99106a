// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbound: offline-tolerant delivery of SDK calls
//!
//! Calls made by the host are queued on disk, stamped with the current
//! identity and sent in order by a background worker once the network is
//! reachable. Transient failures are retried with exponential backoff;
//! permanent failures are dropped. A cached remote config can switch the
//! whole layer off.

pub mod dispatcher;
pub mod env;
pub mod error;
pub mod facade;
pub mod reachability;
pub mod remote_config;
pub mod settings;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use dispatcher::{
    Delivery, DeliveryOutcome, DeliveryReport, DispatchHold, Dispatcher, DispatcherOptions,
    DropReason,
};
pub use error::{Error, Result};
pub use facade::{Outbound, OutboundBuilder, Status};
pub use reachability::{
    NetworkProbe, NetworkStatus, ReachabilityChange, ReachabilityFlags, ReachabilityMonitor,
    RouteTableProbe,
};
pub use remote_config::RemoteConfig;
pub use settings::{Settings, SDK_VERSION};
pub use transport::{HttpTransport, Response, Transport, TransportError};

pub use ob_core::{IdentityTransition, QueueState, RemoteConfigSnapshot};
